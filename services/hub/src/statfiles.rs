//! Stats-file watchers.
//!
//! A statistics crew's workstation rewrites a summary XML file on disk as
//! the game progresses. One watcher per sport polls the file's mtime and
//! reparses on change; the parsed record is the per-sport latest value for
//! the stats read API. A parse that comes back empty never overwrites the
//! last good record.
//!
//! One lock guards the whole config/data/watcher table. Configuration is
//! persisted to its own JSON file, keyed by sport.

use crate::ingest::{WorkerHandle, stop_channel};
use crate::store::epoch_seconds;
use oes_core::Sport;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

const DEFAULT_POLL_INTERVAL: f64 = 5.0;
const MIN_POLL_INTERVAL: f64 = 1.0;
const MAX_POLL_INTERVAL: f64 = 60.0;

/// Injected away-colour lookup, shared with the XML parser seam.
pub type ColorFn = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

/// Per-sport watcher configuration, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatFileConfig {
    pub enabled: bool,
    pub file_path: String,
    pub poll_interval: f64,
}

impl Default for StatFileConfig {
    fn default() -> Self {
        StatFileConfig {
            enabled: false,
            file_path: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Default)]
struct StatInner {
    config: HashMap<Sport, StatFileConfig>,
    data: HashMap<Sport, Map<String, Value>>,
    mtimes: HashMap<Sport, f64>,
    watchers: HashMap<Sport, WorkerHandle>,
}

struct Shared {
    path: PathBuf,
    color_lookup: Option<ColorFn>,
    inner: Mutex<StatInner>,
}

/// Cheaply cloneable handle to the watcher table; all clones share state.
#[derive(Clone)]
pub struct StatFileManager {
    shared: Arc<Shared>,
}

impl StatFileManager {
    pub fn new(path: PathBuf) -> StatFileManager {
        Self::build(path, None)
    }

    pub fn with_color_lookup(path: PathBuf, lookup: ColorFn) -> StatFileManager {
        Self::build(path, Some(lookup))
    }

    fn build(path: PathBuf, color_lookup: Option<ColorFn>) -> StatFileManager {
        let mut inner = StatInner::default();
        for sport in Sport::ALL {
            inner.config.insert(sport, StatFileConfig::default());
        }
        for (sport, config) in read_config(&path) {
            inner.config.insert(sport, config);
        }
        StatFileManager {
            shared: Arc::new(Shared {
                path,
                color_lookup,
                inner: Mutex::new(inner),
            }),
        }
    }

    /// Start watchers for every sport the persisted config enables.
    pub async fn start_configured(&self) {
        let configs: Vec<(Sport, StatFileConfig)> = {
            let inner = self.shared.inner.lock().await;
            inner
                .config
                .iter()
                .map(|(sport, config)| (*sport, config.clone()))
                .collect()
        };
        for (sport, config) in configs {
            if config.enabled && !config.file_path.is_empty() {
                self.start_watcher(sport, config.file_path, config.poll_interval)
                    .await;
            }
        }
    }

    pub async fn get_data(&self, sport: Sport) -> Map<String, Value> {
        self.shared
            .inner
            .lock()
            .await
            .data
            .get(&sport)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn get_config(&self, sport: Sport) -> Value {
        let inner = self.shared.inner.lock().await;
        let config = inner.config.get(&sport).cloned().unwrap_or_default();
        config_json(&config, inner.watchers.contains_key(&sport))
    }

    /// Apply a config update: merge the payload over the current values,
    /// clamp the poll interval, start or stop the watcher, persist, and
    /// return the effective configuration.
    pub async fn update_config(&self, sport: Sport, payload: &Map<String, Value>) -> Value {
        let current = {
            let inner = self.shared.inner.lock().await;
            inner.config.get(&sport).cloned().unwrap_or_default()
        };

        let file_path = payload
            .get("file_path")
            .and_then(Value::as_str)
            .map(|p| p.trim().to_owned())
            .unwrap_or(current.file_path);
        let poll_interval = match payload.get("poll_interval") {
            Some(value) => value_f64(value).unwrap_or(DEFAULT_POLL_INTERVAL),
            None => current.poll_interval,
        }
        .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        let mut enabled = payload
            .get("enabled")
            .map(value_truthy)
            .unwrap_or(current.enabled);

        if enabled && !file_path.is_empty() {
            self.start_watcher(sport, file_path.clone(), poll_interval)
                .await;
        } else {
            self.stop_watcher(sport).await;
            // Cannot be enabled without a file path.
            enabled = false;
        }

        let (config, running) = {
            let mut inner = self.shared.inner.lock().await;
            let config = StatFileConfig {
                enabled,
                file_path,
                poll_interval,
            };
            inner.config.insert(sport, config.clone());
            (config, inner.watchers.contains_key(&sport))
        };
        self.save().await;
        config_json(&config, running)
    }

    /// Start (or restart) the watcher for a sport.
    pub async fn start_watcher(&self, sport: Sport, file_path: String, poll_interval: f64) {
        self.stop_watcher(sport).await;
        let interval =
            Duration::from_secs_f64(poll_interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL));
        let (stop_tx, stop_rx) = stop_channel();
        let task = tokio::spawn(watch_loop(
            self.clone(),
            sport,
            file_path,
            interval,
            stop_rx,
        ));
        self.shared
            .inner
            .lock()
            .await
            .watchers
            .insert(sport, WorkerHandle::new(stop_tx, task));
    }

    pub async fn stop_watcher(&self, sport: Sport) {
        let handle = {
            let mut inner = self.shared.inner.lock().await;
            inner.mtimes.remove(&sport);
            inner.watchers.remove(&sport)
        };
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    /// One poll pass: compare mtime, reparse on change.
    async fn poll_once(&self, sport: Sport, file_path: &str) {
        let Ok(metadata) = tokio::fs::metadata(file_path).await else {
            return;
        };
        let Ok(modified) = metadata.modified() else {
            return;
        };
        let mtime = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let last = self.shared.inner.lock().await.mtimes.get(&sport).copied();
        if last.is_some_and(|last| mtime <= last) {
            return;
        }

        let xml = match tokio::fs::read_to_string(file_path).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(sport = %sport, error = %e, "failed to read stat file");
                return;
            }
        };
        let parsed = match &self.shared.color_lookup {
            Some(lookup) => {
                statcrew_xml::parse_summary_with_colors(&xml, &|name, code| lookup(name, code))
            }
            None => statcrew_xml::parse_summary(&xml),
        };
        if parsed.is_empty() {
            // Parse failure; keep the last good record.
            return;
        }

        let mut record = parsed;
        record.insert(
            "_meta".to_owned(),
            json!({ "source": file_path, "mtime": mtime, "parsed_at": epoch_seconds() }),
        );
        let mut inner = self.shared.inner.lock().await;
        inner.data.insert(sport, record);
        inner.mtimes.insert(sport, mtime);
        info!(sport = %sport, "stat file data updated");
    }

    async fn save(&self) {
        let snapshot: HashMap<String, StatFileConfig> = {
            let inner = self.shared.inner.lock().await;
            inner
                .config
                .iter()
                .map(|(sport, config)| (sport.name().to_owned(), config.clone()))
                .collect()
        };
        let payload = match serde_json::to_string_pretty(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize stat file config");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.shared.path, payload).await {
            warn!(path = %self.shared.path.display(), error = %e, "failed to write stat file config");
        }
    }
}

async fn watch_loop(
    manager: StatFileManager,
    sport: Sport,
    file_path: String,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    info!(sport = %sport, path = %file_path, "stat file watcher started");
    loop {
        if *stop.borrow() {
            break;
        }
        manager.poll_once(sport, &file_path).await;
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
    info!(sport = %sport, "stat file watcher stopped");
}

fn config_json(config: &StatFileConfig, running: bool) -> Value {
    json!({
        "enabled": config.enabled,
        "file_path": config.file_path,
        "poll_interval": config.poll_interval,
        "running": running,
    })
}

fn read_config(path: &std::path::Path) -> Vec<(Sport, StatFileConfig)> {
    if !path.exists() {
        return Vec::new();
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read stat file config");
            return Vec::new();
        }
    };
    let raw: Map<String, Value> = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse stat file config");
            return Vec::new();
        }
    };
    raw.into_iter()
        .filter_map(|(sport, value)| {
            let sport = Sport::normalize(&sport)?;
            let map = value.as_object()?;
            Some((
                sport,
                StatFileConfig {
                    enabled: map.get("enabled").map(value_truthy).unwrap_or(false),
                    file_path: map
                        .get("file_path")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_owned(),
                    poll_interval: map
                        .get("poll_interval")
                        .and_then(value_f64)
                        .unwrap_or(DEFAULT_POLL_INTERVAL),
                },
            ))
        })
        .collect()
}

/// Loose truthiness for JSON config fields, matching what operators
/// actually send.
pub(crate) fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// A number, or a string holding one.
pub(crate) fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
