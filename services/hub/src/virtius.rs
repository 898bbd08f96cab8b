//! Gymnastics session feed.
//!
//! Meet scoring for gymnastics runs in a hosted service rather than on a
//! scoreboard console; operators paste a session link and the hub polls
//! the session JSON on an interval. The raw document is reshaped into
//! what the graphics need: team totals and per-event scores, the rotation
//! currently in progress, the lineups on each apparatus, and event /
//! all-around leaderboards.

use crate::ingest::{WorkerHandle, stop_channel};
use crate::statfiles::{value_f64, value_truthy};
use crate::store::epoch_seconds;
use oes_core::Sport;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

const DEFAULT_POLL_INTERVAL: f64 = 2.0;
const MIN_POLL_INTERVAL: f64 = 1.0;
const MAX_POLL_INTERVAL: f64 = 60.0;
const LEADER_LIMIT: usize = 6;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const SUPPORTED: [Sport; 1] = [Sport::Gymnastics];

pub fn normalize_sport(raw: &str) -> Option<Sport> {
    Sport::normalize(raw).filter(|sport| SUPPORTED.contains(sport))
}

#[derive(Debug, Clone)]
pub struct VirtiusConfig {
    pub enabled: bool,
    pub session_url: String,
    pub session_key: String,
    pub poll_interval: f64,
}

impl Default for VirtiusConfig {
    fn default() -> Self {
        VirtiusConfig {
            enabled: false,
            session_url: String::new(),
            session_key: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Default)]
struct VirtiusInner {
    config: HashMap<Sport, VirtiusConfig>,
    data: HashMap<Sport, Map<String, Value>>,
    watchers: HashMap<Sport, WorkerHandle>,
}

struct Shared {
    path: PathBuf,
    client: reqwest::Client,
    inner: Mutex<VirtiusInner>,
}

/// Cheaply cloneable handle to the session pollers; all clones share
/// state.
#[derive(Clone)]
pub struct VirtiusManager {
    shared: Arc<Shared>,
}

impl VirtiusManager {
    pub fn new(path: PathBuf) -> VirtiusManager {
        let mut inner = VirtiusInner::default();
        for sport in SUPPORTED {
            inner.config.insert(sport, VirtiusConfig::default());
        }
        for (sport, config) in read_config(&path) {
            inner.config.insert(sport, config);
        }
        VirtiusManager {
            shared: Arc::new(Shared {
                path,
                client: reqwest::Client::new(),
                inner: Mutex::new(inner),
            }),
        }
    }

    pub async fn start_configured(&self) {
        let configs: Vec<(Sport, VirtiusConfig)> = {
            let inner = self.shared.inner.lock().await;
            inner
                .config
                .iter()
                .map(|(sport, config)| (*sport, config.clone()))
                .collect()
        };
        for (sport, config) in configs {
            if config.enabled && !config.session_key.is_empty() {
                self.start_watcher(sport, config.session_key, config.poll_interval)
                    .await;
            }
        }
    }

    pub async fn get_data(&self, sport: Sport) -> Map<String, Value> {
        self.shared.inner
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

    pub async fn update_config(&self, sport: Sport, payload: &Map<String, Value>) -> Value {
        let current = {
            let inner = self.shared.inner.lock().await;
            inner.config.get(&sport).cloned().unwrap_or_default()
        };

        let raw_url = payload
            .get("session_url")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned)
            .unwrap_or(current.session_url);
        let (session_url, session_key) = normalize_session_url(&raw_url);
        let poll_interval = match payload.get("poll_interval") {
            Some(value) => value_f64(value).unwrap_or(DEFAULT_POLL_INTERVAL),
            None => current.poll_interval,
        }
        .clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL);
        let mut enabled = payload
            .get("enabled")
            .map(value_truthy)
            .unwrap_or(current.enabled);

        if enabled && !session_key.is_empty() {
            self.start_watcher(sport, session_key.clone(), poll_interval).await;
        } else {
            self.stop_watcher(sport).await;
            enabled = false;
        }

        let (config, running) = {
            let mut inner = self.shared.inner.lock().await;
            let config = VirtiusConfig {
                enabled,
                session_url,
                session_key,
                poll_interval,
            };
            inner.config.insert(sport, config.clone());
            (config, inner.watchers.contains_key(&sport))
        };
        self.save().await;
        config_json(&config, running)
    }

    async fn start_watcher(&self, sport: Sport, session_key: String, poll_interval: f64) {
        self.stop_watcher(sport).await;
        let interval =
            Duration::from_secs_f64(poll_interval.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL));
        let (stop_tx, stop_rx) = stop_channel();
        let task = tokio::spawn(poll_loop(self.clone(), sport, session_key, interval, stop_rx));
        self.shared.inner
            .lock()
            .await
            .watchers
            .insert(sport, WorkerHandle::new(stop_tx, task));
    }

    async fn stop_watcher(&self, sport: Sport) {
        let handle = self.shared.inner.lock().await.watchers.remove(&sport);
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    async fn poll_once(&self, sport: Sport, session_key: &str) {
        match self.fetch_session(session_key).await {
            Ok(raw) => {
                let mut parsed = parse_session(&raw);
                if parsed.is_empty() {
                    return;
                }
                parsed.insert(
                    "_meta".to_owned(),
                    json!({ "source": session_key, "fetched_at": epoch_seconds() }),
                );
                self.shared.inner.lock().await.data.insert(sport, parsed);
            }
            Err(e) => {
                // Keep the last good record but note the failure on it.
                let mut inner = self.shared.inner.lock().await;
                let record = inner.data.entry(sport).or_default();
                let meta = record
                    .entry("_meta".to_owned())
                    .or_insert_with(|| json!({}));
                if let Some(meta) = meta.as_object_mut() {
                    meta.insert("error".to_owned(), json!(e.to_string()));
                    meta.insert("error_at".to_owned(), json!(epoch_seconds()));
                }
            }
        }
    }

    async fn fetch_session(&self, session_key: &str) -> Result<Value, reqwest::Error> {
        self.shared.client
            .get(format!("https://api.virti.us/session/{session_key}/json"))
            .header("Accept", "application/json")
            .timeout(FETCH_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    async fn save(&self) {
        let snapshot: Map<String, Value> = {
            let inner = self.shared.inner.lock().await;
            inner
                .config
                .iter()
                .map(|(sport, config)| {
                    (
                        sport.name().to_owned(),
                        json!({
                            "enabled": config.enabled,
                            "session_url": config.session_url,
                            "session_key": config.session_key,
                            "poll_interval": config.poll_interval,
                        }),
                    )
                })
                .collect()
        };
        let payload = match serde_json::to_string_pretty(&snapshot) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize session feed config");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.shared.path, payload).await {
            warn!(path = %self.shared.path.display(), error = %e, "failed to write session feed config");
        }
    }
}

async fn poll_loop(
    manager: VirtiusManager,
    sport: Sport,
    session_key: String,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    info!(sport = %sport, session = %session_key, "session feed watcher started");
    loop {
        if *stop.borrow() {
            break;
        }
        manager.poll_once(sport, &session_key).await;
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
    info!(sport = %sport, "session feed watcher stopped");
}

fn config_json(config: &VirtiusConfig, running: bool) -> Value {
    json!({
        "enabled": config.enabled,
        "session_url": config.session_url,
        "session_key": config.session_key,
        "poll_interval": config.poll_interval,
        "running": running,
    })
}

fn read_config(path: &std::path::Path) -> Vec<(Sport, VirtiusConfig)> {
    if !path.exists() {
        return Vec::new();
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read session feed config");
            return Vec::new();
        }
    };
    let raw: Map<String, Value> = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse session feed config");
            return Vec::new();
        }
    };
    raw.into_iter()
        .filter_map(|(sport, value)| {
            let sport = normalize_sport(&sport)?;
            let map = value.as_object()?;
            let (session_url, session_key) = normalize_session_url(
                map.get("session_url").and_then(Value::as_str).unwrap_or(""),
            );
            Some((
                sport,
                VirtiusConfig {
                    enabled: map.get("enabled").map(value_truthy).unwrap_or(false)
                        && !session_key.is_empty(),
                    session_url,
                    session_key,
                    poll_interval: map
                        .get("poll_interval")
                        .and_then(value_f64)
                        .unwrap_or(DEFAULT_POLL_INTERVAL),
                },
            ))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Session link handling
// ---------------------------------------------------------------------------

/// Pull the session key out of whatever the operator pasted: a full link
/// with `?s=`, a `/session/<key>` path, or the bare key itself.
pub fn extract_session_key(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(url) = reqwest::Url::parse(raw) {
        if url.has_host() {
            if let Some(key) = url
                .query_pairs()
                .find(|(name, _)| name == "s")
                .map(|(_, value)| value.into_owned())
            {
                if !key.is_empty() {
                    return key;
                }
            }
            let segments: Vec<&str> = url
                .path_segments()
                .map(|s| s.filter(|part| !part.is_empty()).collect())
                .unwrap_or_default();
            if segments.len() >= 2 && segments[0].eq_ignore_ascii_case("session") {
                return segments[1].to_owned();
            }
        }
    }
    raw.to_owned()
}

/// Canonical `(session_url, session_key)` pair; a bare key gets a
/// synthesized link.
pub fn normalize_session_url(raw: &str) -> (String, String) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (String::new(), String::new());
    }
    let key = extract_session_key(raw);
    if key.is_empty() {
        return (String::new(), String::new());
    }
    if reqwest::Url::parse(raw).is_ok() {
        (raw.to_owned(), key)
    } else {
        (format!("https://virti.us/session?s={key}"), key)
    }
}

// ---------------------------------------------------------------------------
// Session JSON shaping
// ---------------------------------------------------------------------------

fn normalize_event_name(name: &str) -> Option<&'static str> {
    let upper = name.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    if upper.contains("VAULT") {
        Some("VAULT")
    } else if upper.contains("BAR") {
        Some("BARS")
    } else if upper.contains("BEAM") {
        Some("BEAM")
    } else if upper.contains("FLOOR") {
        Some("FLOOR")
    } else if (upper.contains("ALL") && upper.contains("AROUND")) || upper == "AA" {
        Some("ALL_AROUND")
    } else {
        None
    }
}

fn parse_score(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Scores render with three decimals; unparseable text passes through.
fn format_score(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => n.as_f64().map(|v| format!("{v:.3}")).unwrap_or_default(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                String::new()
            } else {
                trimmed
                    .parse::<f64>()
                    .map(|v| format!("{v:.3}"))
                    .unwrap_or_else(|_| trimmed.to_owned())
            }
        }
        Some(_) => String::new(),
    }
}

fn gymnast_name(gymnast: &Map<String, Value>) -> String {
    if let Some(full) = gymnast.get("full_name").and_then(Value::as_str) {
        if !full.is_empty() {
            return full.to_owned();
        }
    }
    let first = gymnast.get("first_name").and_then(Value::as_str).unwrap_or("");
    let last = gymnast.get("last_name").and_then(Value::as_str).unwrap_or("");
    [first, last]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}

/// Exhibition slots carry `type = 0` and stay off lineups and leaderboards.
fn is_exhibition(gymnast: &Map<String, Value>) -> bool {
    match gymnast.get("type") {
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        Some(Value::String(s)) => s.trim() == "0",
        _ => false,
    }
}

fn team_events(team: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    team.get("events")
        .and_then(Value::as_array)
        .map(|events| events.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn event_gymnasts(event: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    event
        .get("gymnasts")
        .and_then(Value::as_array)
        .map(|gymnasts| gymnasts.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// An event still has gymnasts without a final score.
fn event_in_progress(event: &Map<String, Value>) -> bool {
    event_gymnasts(event).iter().any(|gymnast| {
        match gymnast.get("final_score") {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        }
    })
}

fn rotation_of(event: &Map<String, Value>) -> Option<&Value> {
    event.get("rotation").filter(|r| !r.is_null())
}

fn rotation_key(rotation: &Value) -> String {
    match rotation {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn rotation_sort_key(rotation: &Value) -> f64 {
    parse_score(Some(rotation)).unwrap_or(f64::MAX)
}

/// The lowest-numbered rotation that still has an event in progress, or
/// the highest one once everything is final.
fn detect_current_rotation(teams: &[&Map<String, Value>]) -> Option<Value> {
    let mut rotations: Vec<Value> = Vec::new();
    for team in teams {
        for event in team_events(team) {
            if let Some(rotation) = rotation_of(event) {
                if !rotations.contains(rotation) {
                    rotations.push(rotation.clone());
                }
            }
        }
    }
    if rotations.is_empty() {
        return None;
    }
    rotations.sort_by(|a, b| {
        rotation_sort_key(a)
            .partial_cmp(&rotation_sort_key(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for rotation in &rotations {
        for team in teams {
            for event in team_events(team) {
                if rotation_of(event) == Some(rotation) && event_in_progress(event) {
                    return Some(rotation.clone());
                }
            }
        }
    }
    rotations.last().cloned()
}

fn team_key(team: &Map<String, Value>) -> String {
    team.get("tricode")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .or_else(|| team.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()))
        .unwrap_or("Team")
        .to_owned()
}

/// Map of rotation number to (team -> apparatus) for the rotation board.
fn build_rotation_events(teams: &[&Map<String, Value>]) -> Map<String, Value> {
    let mut rotation_events = Map::new();
    for team in teams {
        let key = team_key(team);
        for event in team_events(team) {
            let (Some(rotation), Some(code)) = (
                rotation_of(event),
                event
                    .get("event_name")
                    .and_then(Value::as_str)
                    .and_then(normalize_event_name),
            ) else {
                continue;
            };
            let slot = rotation_events
                .entry(rotation_key(rotation))
                .or_insert_with(|| json!({}));
            if let Some(slot) = slot.as_object_mut() {
                slot.insert(key.clone(), json!(code));
            }
        }
    }
    rotation_events
}

/// Lineups on each apparatus for the rotation in progress, keyed by both
/// team id and tricode.
fn build_current_lineups(
    teams: &[&Map<String, Value>],
    current_rotation: Option<&Value>,
) -> Map<String, Value> {
    let mut lineups = Map::new();
    let Some(current_rotation) = current_rotation else {
        return lineups;
    };

    for team in teams {
        let mut current = None;
        for event in team_events(team) {
            if rotation_of(event) != Some(current_rotation) {
                continue;
            }
            let Some(code) = event
                .get("event_name")
                .and_then(Value::as_str)
                .and_then(normalize_event_name)
            else {
                continue;
            };
            if code == "ALL_AROUND" {
                continue;
            }
            current = Some((code, event));
            break;
        }
        let Some((code, event)) = current else {
            continue;
        };

        let mut gymnasts: Vec<(i64, Value)> = Vec::new();
        for gymnast in event_gymnasts(event) {
            if is_exhibition(gymnast) {
                continue;
            }
            let mut name = gymnast_name(gymnast);
            if name.is_empty() {
                name = "Gymnast".to_owned();
            }
            let order = gymnast
                .get("order")
                .and_then(|o| parse_score(Some(o)))
                .map(|o| o as i64)
                .unwrap_or(999);
            gymnasts.push((
                order,
                json!({
                    "name": name,
                    "score": format_score(gymnast.get("final_score")),
                    "order": order,
                }),
            ));
        }
        gymnasts.sort_by_key(|(order, _)| *order);

        let payload = json!({
            "event": code,
            "gymnasts": gymnasts.into_iter().map(|(_, g)| g).collect::<Vec<_>>(),
        });
        if let Some(id) = team.get("team_id") {
            if !id.is_null() {
                lineups.insert(rotation_key(id), payload.clone());
            }
        }
        lineups.insert(team_key(team), payload);
    }
    lineups
}

/// All-around totals computed from the four apparatus scores, for meets
/// whose feed does not publish an AA leaderboard.
fn compute_all_around_leaders(teams: &[&Map<String, Value>], limit: usize) -> Vec<Value> {
    struct Entry {
        name: String,
        team: String,
        scores: HashMap<&'static str, f64>,
    }
    let mut gymnasts: Vec<(String, Entry)> = Vec::new();

    for team in teams {
        let team_code = team_key(team);
        for event in team_events(team) {
            let Some(code) = event
                .get("event_name")
                .and_then(Value::as_str)
                .and_then(normalize_event_name)
            else {
                continue;
            };
            if code == "ALL_AROUND" {
                continue;
            }
            for gymnast in event_gymnasts(event) {
                if is_exhibition(gymnast) {
                    continue;
                }
                let Some(score) = parse_score(gymnast.get("final_score")) else {
                    continue;
                };
                let name = gymnast_name(gymnast);
                if name.is_empty() {
                    continue;
                }
                let id = gymnast
                    .get("gymnast_id")
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(ToOwned::to_owned)
                    .unwrap_or_else(|| format!("{team_code}:{name}"));
                let index = match gymnasts.iter().position(|(key, _)| *key == id) {
                    Some(index) => index,
                    None => {
                        gymnasts.push((
                            id,
                            Entry {
                                name,
                                team: gymnast
                                    .get("tricode")
                                    .and_then(Value::as_str)
                                    .filter(|t| !t.is_empty())
                                    .unwrap_or(&team_code)
                                    .to_owned(),
                                scores: HashMap::new(),
                            },
                        ));
                        gymnasts.len() - 1
                    }
                };
                gymnasts[index].1.scores.insert(code, score);
            }
        }
    }

    let mut results: Vec<(f64, Value)> = gymnasts
        .into_iter()
        .filter(|(_, entry)| entry.scores.len() >= 4)
        .map(|(_, entry)| {
            let total: f64 = entry.scores.values().sum();
            (
                total,
                json!({
                    "name": entry.name,
                    "team": entry.team,
                    "score": format!("{total:.3}"),
                    "place": Value::Null,
                }),
            )
        })
        .collect();
    results.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    results.into_iter().take(limit).map(|(_, v)| v).collect()
}

/// Shape a fetched session document. Empty output means the document had
/// no meet payload at all.
pub fn parse_session(payload: &Value) -> Map<String, Value> {
    let Some(payload) = payload.as_object() else {
        return Map::new();
    };
    let meet = payload
        .get("meet")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let teams_raw: Vec<&Map<String, Value>> = meet
        .get("teams")
        .and_then(Value::as_array)
        .map(|teams| teams.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();
    let event_results: Vec<&Map<String, Value>> = meet
        .get("event_results")
        .and_then(Value::as_array)
        .map(|results| results.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();

    // Team cards with per-event scores and a total.
    let mut teams: Vec<Map<String, Value>> = Vec::new();
    for team in &teams_raw {
        let mut event_scores = Map::new();
        let mut event_rotations = Map::new();
        for event in team_events(team) {
            let Some(code) = event
                .get("event_name")
                .and_then(Value::as_str)
                .and_then(normalize_event_name)
            else {
                continue;
            };
            if code == "ALL_AROUND" {
                continue;
            }
            event_scores.insert(code.to_owned(), json!(format_score(event.get("event_score"))));
            event_rotations.insert(
                code.to_owned(),
                event.get("rotation").cloned().unwrap_or(Value::Null),
            );
        }

        let total_score = match parse_score(team.get("final_score")) {
            Some(final_score) => format!("{final_score:.3}"),
            None => {
                let sum: f64 = event_scores
                    .values()
                    .filter_map(|score| parse_score(Some(score)))
                    .sum();
                let any = event_scores
                    .values()
                    .any(|score| parse_score(Some(score)).is_some());
                if any { format!("{sum:.3}") } else { String::new() }
            }
        };

        let mut card = Map::new();
        card.insert("id".to_owned(), team.get("team_id").cloned().unwrap_or(Value::Null));
        card.insert(
            "name".to_owned(),
            json!(
                team.get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .or_else(|| team.get("tricode").and_then(Value::as_str))
                    .unwrap_or("Team")
            ),
        );
        card.insert(
            "tricode".to_owned(),
            json!(team.get("tricode").and_then(Value::as_str).unwrap_or("")),
        );
        card.insert(
            "home".to_owned(),
            json!(team.get("home_team").map(value_truthy).unwrap_or(false)),
        );
        card.insert("place".to_owned(), team.get("place").cloned().unwrap_or(Value::Null));
        card.insert("score".to_owned(), json!(total_score));
        card.insert("event_scores".to_owned(), Value::Object(event_scores));
        card.insert("event_rotations".to_owned(), Value::Object(event_rotations));
        teams.push(card);
    }

    let rotation_events = build_rotation_events(&teams_raw);
    let current_rotation = detect_current_rotation(&teams_raw);
    let lineups = build_current_lineups(&teams_raw, current_rotation.as_ref());

    // Event leaderboards straight from the feed.
    let mut leaders = Map::new();
    for result in &event_results {
        let Some(code) = result
            .get("event_name")
            .and_then(Value::as_str)
            .and_then(normalize_event_name)
        else {
            continue;
        };
        let mut entries: Vec<(i64, Value)> = Vec::new();
        for gymnast in event_gymnasts(result) {
            let place = gymnast
                .get("place")
                .and_then(|p| parse_score(Some(p)))
                .map(|p| p as i64)
                .unwrap_or(999);
            let mut name = gymnast_name(gymnast);
            if name.is_empty() {
                name = "Gymnast".to_owned();
            }
            entries.push((
                place,
                json!({
                    "name": name,
                    "score": format_score(gymnast.get("final_score")),
                    "team": gymnast
                        .get("tricode")
                        .and_then(Value::as_str)
                        .or_else(|| gymnast.get("short_name").and_then(Value::as_str))
                        .unwrap_or(""),
                    "place": gymnast.get("place").cloned().unwrap_or(Value::Null),
                }),
            ));
        }
        entries.sort_by_key(|(place, _)| *place);
        leaders.insert(
            code.to_owned(),
            Value::Array(entries.into_iter().take(LEADER_LIMIT).map(|(_, v)| v).collect()),
        );
    }

    // Top up the all-around board from apparatus scores when the feed's
    // own list is short.
    let published = leaders
        .get("ALL_AROUND")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if published < LEADER_LIMIT {
        let computed = compute_all_around_leaders(&teams_raw, LEADER_LIMIT);
        if computed.len() > published {
            leaders.insert("ALL_AROUND".to_owned(), Value::Array(computed));
        }
    }

    // Attach the live lineup to each team card.
    for card in &mut teams {
        let id_key = card.get("id").filter(|id| !id.is_null()).map(rotation_key);
        let code_key = card
            .get("tricode")
            .and_then(Value::as_str)
            .filter(|code| !code.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| card.get("name").and_then(Value::as_str).map(ToOwned::to_owned));
        let lineup = id_key
            .and_then(|key| lineups.get(&key))
            .or_else(|| code_key.and_then(|key| lineups.get(&key)));
        if let Some(lineup) = lineup {
            card.insert(
                "current_event".to_owned(),
                lineup.get("event").cloned().unwrap_or(Value::Null),
            );
            card.insert(
                "current_lineup".to_owned(),
                lineup.get("gymnasts").cloned().unwrap_or(Value::Null),
            );
        }
    }

    if meet.is_empty() && teams.is_empty() {
        return Map::new();
    }

    let mut out = Map::new();
    out.insert(
        "meet".to_owned(),
        json!({
            "name": meet.get("name").and_then(Value::as_str).unwrap_or(""),
            "location": meet.get("location").and_then(Value::as_str).unwrap_or(""),
            "date_time": meet.get("date_time").and_then(Value::as_str).unwrap_or(""),
        }),
    );
    out.insert(
        "teams".to_owned(),
        Value::Array(teams.into_iter().map(Value::Object).collect()),
    );
    out.insert(
        "current_rotation".to_owned(),
        current_rotation.unwrap_or(Value::Null),
    );
    out.insert("rotation_events".to_owned(), Value::Object(rotation_events));
    out.insert("leaders".to_owned(), Value::Object(leaders));
    out.insert("updated_at".to_owned(), json!(epoch_seconds()));
    out
}
