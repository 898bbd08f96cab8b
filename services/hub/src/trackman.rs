//! Radar (pitch/hit tracking) feed listeners.
//!
//! Ball-tracking units broadcast JSON datagrams on the local network in
//! one of two shapes: the broadcast feed (nested `Pitch`/`Hit` objects)
//! or the flatter scoreboard feed. One UDP listener per sport (baseball
//! and softball only) shapes whatever arrives into a small fixed field
//! set and keeps the raw text plus the last parse error around for the
//! debug endpoint.

use crate::ingest::{WorkerHandle, stop_channel};
use crate::statfiles::value_truthy;
use crate::store::epoch_seconds;
use oes_core::Sport;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 20998;
const DATAGRAM_BUFFER: usize = 8192;

const SUPPORTED: [Sport; 2] = [Sport::Baseball, Sport::Softball];

/// Normalize a sport name against the radar-capable set.
pub fn normalize_sport(raw: &str) -> Option<Sport> {
    Sport::normalize(raw).filter(|sport| SUPPORTED.contains(sport))
}

#[derive(Debug, Clone)]
pub struct TrackmanConfig {
    pub enabled: bool,
    pub port: u16,
    pub feed_type: String,
}

impl Default for TrackmanConfig {
    fn default() -> Self {
        TrackmanConfig {
            enabled: false,
            port: DEFAULT_PORT,
            feed_type: "broadcast".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DebugRecord {
    raw: String,
    error: String,
}

#[derive(Default)]
struct TrackInner {
    config: HashMap<Sport, TrackmanConfig>,
    data: HashMap<Sport, Map<String, Value>>,
    debug: HashMap<Sport, DebugRecord>,
    listeners: HashMap<Sport, WorkerHandle>,
    ports: HashMap<Sport, u16>,
}

/// Rejection from a config update, already shaped for the HTTP layer.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// 400
    InvalidPort,
    /// 400
    InvalidFeedType,
    /// 409
    PortInUse,
}

/// Cheaply cloneable handle to the radar listener table; all clones
/// share state.
#[derive(Clone)]
pub struct TrackmanManager {
    inner: Arc<Mutex<TrackInner>>,
}

impl Default for TrackmanManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackmanManager {
    pub fn new() -> TrackmanManager {
        let mut inner = TrackInner::default();
        for sport in SUPPORTED {
            inner.config.insert(sport, TrackmanConfig::default());
        }
        TrackmanManager {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub async fn get_data(&self, sport: Sport) -> Map<String, Value> {
        self.inner
            .lock()
            .await
            .data
            .get(&sport)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn get_debug(&self, sport: Sport) -> Value {
        let inner = self.inner.lock().await;
        let debug = inner.debug.get(&sport).cloned().unwrap_or_default();
        json!({
            "raw": debug.raw,
            "error": debug.error,
            "parsed": inner.data.get(&sport).cloned().unwrap_or_default(),
        })
    }

    pub async fn get_config(&self, sport: Sport) -> Value {
        let inner = self.inner.lock().await;
        let config = inner.config.get(&sport).cloned().unwrap_or_default();
        config_json(&config, inner.listeners.contains_key(&sport))
    }

    /// Apply a config update; `Err` maps straight to an HTTP status in
    /// the handler.
    pub async fn update_config(
        &self,
        sport: Sport,
        payload: &Map<String, Value>,
    ) -> Result<Value, ConfigError> {
        let current = {
            let inner = self.inner.lock().await;
            inner.config.get(&sport).cloned().unwrap_or_default()
        };

        let port = match payload.get("port") {
            Some(value) => crate::registry::parse_port(value).ok_or(ConfigError::InvalidPort)?,
            None => current.port,
        };
        let feed_type = payload
            .get("feed_type")
            .and_then(Value::as_str)
            .map(|f| f.trim().to_ascii_lowercase())
            .unwrap_or(current.feed_type);
        if feed_type != "broadcast" && feed_type != "scoreboard" {
            return Err(ConfigError::InvalidFeedType);
        }
        let enabled = payload
            .get("enabled")
            .map(value_truthy)
            .unwrap_or(current.enabled);

        if enabled {
            let conflict = {
                let inner = self.inner.lock().await;
                inner
                    .ports
                    .iter()
                    .any(|(other, &other_port)| *other != sport && other_port == port)
            };
            if conflict {
                return Err(ConfigError::PortInUse);
            }
            self.start_listener(sport, port).await;
        } else {
            self.stop_listener(sport).await;
        }

        let (config, running) = {
            let mut inner = self.inner.lock().await;
            let config = TrackmanConfig {
                enabled,
                port,
                feed_type,
            };
            inner.config.insert(sport, config.clone());
            (config, inner.listeners.contains_key(&sport))
        };
        Ok(config_json(&config, running))
    }

    async fn start_listener(&self, sport: Sport, port: u16) {
        self.stop_listener(sport).await;
        let (stop_tx, stop_rx) = stop_channel();
        let task = tokio::spawn(listen(self.clone(), sport, port, stop_rx));
        let mut inner = self.inner.lock().await;
        inner.listeners.insert(sport, WorkerHandle::new(stop_tx, task));
        inner.ports.insert(sport, port);
    }

    async fn stop_listener(&self, sport: Sport) {
        let handle = {
            let mut inner = self.inner.lock().await;
            inner.ports.remove(&sport);
            inner.listeners.remove(&sport)
        };
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    async fn ingest_datagram(&self, sport: Sport, port: u16, raw: &[u8]) {
        let raw_text = String::from_utf8_lossy(raw).into_owned();
        {
            let mut inner = self.inner.lock().await;
            inner.debug.insert(
                sport,
                DebugRecord {
                    raw: raw_text.clone(),
                    error: String::new(),
                },
            );
        }

        let payloads = extract_payloads(&raw_text);
        if payloads.is_empty() {
            self.set_debug_error(sport, "unable to parse json").await;
            return;
        }

        let mut shaped = None;
        for payload in &payloads {
            let candidate = shape_payload(payload);
            if !candidate.is_empty() {
                shaped = Some(candidate);
            }
        }
        let Some(mut shaped) = shaped else {
            self.set_debug_error(sport, "no supported fields").await;
            return;
        };

        shaped.insert(
            "_meta".to_owned(),
            json!({ "source": format!("udp:{port}"), "received_at": epoch_seconds() }),
        );
        self.inner.lock().await.data.insert(sport, shaped);
    }

    async fn set_debug_error(&self, sport: Sport, error: &str) {
        let mut inner = self.inner.lock().await;
        inner.debug.entry(sport).or_default().error = error.to_owned();
    }
}

async fn listen(
    manager: TrackmanManager,
    sport: Sport,
    port: u16,
    mut stop: watch::Receiver<bool>,
) {
    let socket = match UdpSocket::bind(("0.0.0.0", port)).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(sport = %sport, port, error = %e, "failed to start radar listener");
            return;
        }
    };
    info!(sport = %sport, port, "radar listener bound");

    let mut buf = [0u8; DATAGRAM_BUFFER];
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((0, _)) => {}
                    Ok((n, _peer)) => manager.ingest_datagram(sport, port, &buf[..n]).await,
                    Err(e) => {
                        warn!(sport = %sport, error = %e, "radar receive error");
                        break;
                    }
                }
            }
        }
    }
    info!(sport = %sport, "radar listener stopped");
}

fn config_json(config: &TrackmanConfig, running: bool) -> Value {
    json!({
        "enabled": config.enabled,
        "port": config.port,
        "feed_type": config.feed_type,
        "running": running,
    })
}

// ---------------------------------------------------------------------------
// Lenient JSON extraction
// ---------------------------------------------------------------------------

/// Pull JSON objects out of a datagram that may hold an array, a single
/// object, newline-delimited objects, or an object surrounded by noise.
fn extract_payloads(raw_text: &str) -> Vec<Map<String, Value>> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
        match parsed {
            Value::Array(items) => {
                return items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect();
            }
            Value::Object(map) => return vec![map],
            _ => {}
        }
    }

    let mut payloads = Vec::new();
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line) {
            payloads.push(map);
        }
    }
    if !payloads.is_empty() {
        return payloads;
    }

    // Last resort: whatever sits between the outermost braces.
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return vec![map];
            }
        }
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Payload shaping
// ---------------------------------------------------------------------------

/// Project a radar payload into the fixed field set, dropping nulls. An
/// empty result means the payload had nothing we understand.
fn shape_payload(payload: &Map<String, Value>) -> Map<String, Value> {
    let mut shaped = Map::new();
    let pitch = payload.get("Pitch").and_then(Value::as_object);
    let hit = payload.get("Hit").and_then(Value::as_object);

    if pitch.is_some() || hit.is_some() {
        shaped.insert("feed_type".to_owned(), json!("broadcast"));

        if let Some(pitch) = pitch {
            put(&mut shaped, "pitch_speed", pitch.get("Speed"));
            put(&mut shaped, "spin_rate", pitch.get("SpinRate"));
            if let Some(location) = pitch.get("Location").and_then(Value::as_object) {
                put(&mut shaped, "plate_x", location.get("X"));
                put(&mut shaped, "plate_y", location.get("Y"));
                put(&mut shaped, "plate_z", location.get("Z"));
            }
            put_first(&mut shaped, "time", &[pitch.get("TrackStartTime")]);
        }
        if let Some(hit) = hit {
            put(&mut shaped, "hit_exit_velocity", hit.get("Speed"));
            put(&mut shaped, "hit_launch_angle", hit.get("Angle"));
            put(&mut shaped, "hit_distance", hit.get("Distance"));
            put_first(&mut shaped, "time", &[hit.get("TrackStartTime")]);
        }
        put_first(
            &mut shaped,
            "track_id",
            &[payload.get("PlayId"), payload.get("TrackId"), payload.get("Id")],
        );
        put_first(&mut shaped, "time", &[payload.get("Time")]);
        return shaped;
    }

    put_first(
        &mut shaped,
        "pitch_speed",
        &[
            payload.get("PitchExitSpeed"),
            payload.get("PitchReleaseSpeed"),
            payload.get("PitchSpeed"),
        ],
    );
    put_first(
        &mut shaped,
        "hit_exit_velocity",
        &[payload.get("HitSpeed"), payload.get("HitExitVelocity")],
    );
    put_first(&mut shaped, "track_id", &[payload.get("Id"), payload.get("TrackId")]);
    put(&mut shaped, "time", payload.get("Time"));

    if shaped.is_empty() {
        return shaped;
    }
    shaped.insert("feed_type".to_owned(), json!("scoreboard"));
    shaped
}

fn put(shaped: &mut Map<String, Value>, key: &str, value: Option<&Value>) {
    if let Some(value) = value {
        if !value.is_null() {
            shaped.insert(key.to_owned(), value.clone());
        }
    }
}

/// Insert the first non-null candidate, keeping an existing value.
fn put_first(shaped: &mut Map<String, Value>, key: &str, candidates: &[Option<&Value>]) {
    if shaped.contains_key(key) {
        return;
    }
    for candidate in candidates {
        if let Some(value) = candidate {
            if !value.is_null() {
                shaped.insert(key.to_owned(), (*value).clone());
                return;
            }
        }
    }
}
