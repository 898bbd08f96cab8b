//! Configured outbound-source registry.
//!
//! An ordered list of scoreboard consoles the hub dials out to, persisted
//! as a JSON array. Identifiers are `tcp:<host>:<port>`, with `:2`, `:3`…
//! appended when the same endpoint is added twice; the suffix keeps the id
//! stable for the UI while letting two workers talk to one console.
//! Identifiers are otherwise opaque; nothing re-derives them from
//! host/port at read time.
//!
//! The registry only mutates its list and file here. Worker lifecycle is
//! driven by the engine from the returned outcomes, so no socket work ever
//! happens under the registry lock.

use oes_core::Sport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;

/// One persisted outbound source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub enabled: bool,
    /// Post-decode sport rewrites, canonical title-cased names on both
    /// sides.
    #[serde(default)]
    pub sport_overrides: BTreeMap<String, String>,
}

/// Fields a PATCH may change. All already validated and normalized by the
/// HTTP layer; `name` is ignored when empty.
#[derive(Debug, Default, Clone)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub sport_overrides: Option<BTreeMap<String, String>>,
}

/// Result of a successful patch.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    pub entry: SourceEntry,
    /// Set when host/port changed and the entry was re-keyed; the worker
    /// under the old id must be stopped.
    pub replaced_id: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("source not found")]
    NotFound,
    #[error("source already exists")]
    Conflict,
}

pub struct SourceRegistry {
    path: PathBuf,
    entries: Mutex<Vec<SourceEntry>>,
}

impl SourceRegistry {
    /// Load the persisted list; a missing or unreadable file starts empty.
    pub fn load(path: impl Into<PathBuf>) -> SourceRegistry {
        let path = path.into();
        let entries = read_entries(&path);
        SourceRegistry {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn list(&self) -> Vec<SourceEntry> {
        self.entries.lock().expect("registry lock").clone()
    }

    /// Display names keyed by source id, for joining into activity
    /// summaries.
    pub fn names_by_id(&self) -> HashMap<String, String> {
        self.entries
            .lock()
            .expect("registry lock")
            .iter()
            .map(|entry| (entry.id.clone(), entry.name.clone()))
            .collect()
    }

    /// Append a new source, choosing the first free id of the form
    /// `tcp:<host>:<port>` or `tcp:<host>:<port>:<n>`.
    pub fn add(
        &self,
        host: &str,
        port: u16,
        name: &str,
        sport_overrides: BTreeMap<String, String>,
    ) -> SourceEntry {
        let entry = {
            let mut entries = self.entries.lock().expect("registry lock");
            let id = unique_source_id(&entries, host, port);
            let entry = SourceEntry {
                id,
                name: if name.is_empty() { host.to_owned() } else { name.to_owned() },
                host: host.to_owned(),
                port,
                enabled: true,
                sport_overrides,
            };
            entries.push(entry.clone());
            entry
        };
        self.save();
        entry
    }

    /// Remove a source by id.
    pub fn remove(&self, id: &str) -> Option<SourceEntry> {
        let removed = {
            let mut entries = self.entries.lock().expect("registry lock");
            let index = entries.iter().position(|entry| entry.id == id)?;
            Some(entries.remove(index))
        };
        self.save();
        removed
    }

    /// Apply a patch. A host/port change re-keys the entry and fails with
    /// [`PatchError::Conflict`] if the recomputed id is already taken.
    pub fn patch(&self, id: &str, changes: &SourcePatch) -> Result<PatchOutcome, PatchError> {
        let outcome = {
            let mut entries = self.entries.lock().expect("registry lock");
            let index = entries
                .iter()
                .position(|entry| entry.id == id)
                .ok_or(PatchError::NotFound)?;

            let effective_host = changes.host.clone().unwrap_or_else(|| entries[index].host.clone());
            let effective_port = changes.port.unwrap_or(entries[index].port);
            let new_id = make_source_id(&effective_host, effective_port);
            let rekeyed = (changes.host.is_some() || changes.port.is_some()) && new_id != id;
            if rekeyed && entries.iter().any(|entry| entry.id == new_id) {
                return Err(PatchError::Conflict);
            }

            let entry = &mut entries[index];
            if let Some(name) = &changes.name {
                if !name.is_empty() {
                    entry.name = name.clone();
                }
            }
            if let Some(enabled) = changes.enabled {
                entry.enabled = enabled;
            }
            if let Some(overrides) = &changes.sport_overrides {
                entry.sport_overrides = overrides.clone();
            }
            if rekeyed {
                entry.host = effective_host;
                entry.port = effective_port;
                entry.id = new_id;
            }
            PatchOutcome {
                entry: entry.clone(),
                replaced_id: rekeyed.then(|| id.to_owned()),
            }
        };
        self.save();
        Ok(outcome)
    }

    /// Look up the configured sport rewrite for a source, if any.
    pub fn override_for(&self, source_id: &str, sport: Sport) -> Option<Sport> {
        let entries = self.entries.lock().expect("registry lock");
        let entry = entries.iter().find(|entry| entry.id == source_id)?;
        entry
            .sport_overrides
            .get(sport.name())
            .and_then(|replacement| Sport::normalize(replacement))
    }

    /// Write the list back to disk. Failures log and continue; the
    /// in-memory list stays authoritative.
    fn save(&self) {
        let entries = self.entries.lock().expect("registry lock").clone();
        let payload = match serde_json::to_string_pretty(&entries) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize data sources");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, payload) {
            warn!(path = %self.path.display(), error = %e, "failed to write data sources");
        }
    }
}

pub fn make_source_id(host: &str, port: u16) -> String {
    format!("tcp:{host}:{port}")
}

fn unique_source_id(entries: &[SourceEntry], host: &str, port: u16) -> String {
    let base = make_source_id(host, port);
    let taken = |candidate: &str| entries.iter().any(|entry| entry.id == candidate);
    if !taken(&base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}:{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Normalize a raw override mapping: title-case both sides against the
/// closed sport set and silently drop anything that does not match.
pub fn normalize_sport_overrides(raw: Option<&Value>) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    let Some(Value::Object(map)) = raw else {
        return normalized;
    };
    for (from, to) in map {
        let Some(from) = Sport::normalize(from) else {
            continue;
        };
        let Some(to) = to.as_str().and_then(Sport::normalize) else {
            continue;
        };
        normalized.insert(from.name().to_owned(), to.name().to_owned());
    }
    normalized
}

// ---------------------------------------------------------------------------
// Persistence format
// ---------------------------------------------------------------------------

/// Raw persisted entry; malformed entries are skipped on load so one bad
/// record cannot take out the whole registry.
#[derive(Deserialize)]
struct RawEntry {
    id: Option<String>,
    name: Option<String>,
    host: Option<String>,
    port: Option<Value>,
    enabled: Option<bool>,
    sport_overrides: Option<Value>,
}

fn read_entries(path: &Path) -> Vec<SourceEntry> {
    if !path.exists() {
        return Vec::new();
    }
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read data sources");
            return Vec::new();
        }
    };
    let raw: Vec<Value> = match serde_json::from_str(&text) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse data sources");
            return Vec::new();
        }
    };
    raw.into_iter()
        .filter_map(|value| serde_json::from_value::<RawEntry>(value).ok())
        .filter_map(normalize_entry)
        .collect()
}

fn normalize_entry(raw: RawEntry) -> Option<SourceEntry> {
    let id = raw.id.filter(|id| !id.is_empty())?;
    let host = raw.host.filter(|host| !host.is_empty())?;
    let port = parse_port(raw.port.as_ref()?)?;
    let name = raw.name.filter(|name| !name.is_empty()).unwrap_or_else(|| id.clone());
    Some(SourceEntry {
        id,
        name,
        host,
        port,
        enabled: raw.enabled.unwrap_or(true),
        sport_overrides: normalize_sport_overrides(raw.sport_overrides.as_ref()),
    })
}

/// Accept a port as either a JSON number or a numeric string.
pub fn parse_port(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| u16::try_from(n).ok()).filter(|&n| n > 0),
        Value::String(s) => s.trim().parse::<u16>().ok().filter(|&n| n > 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scratch_registry() -> (tempfile::TempDir, SourceRegistry) {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = SourceRegistry::load(dir.path().join("data_sources.json"));
        (dir, registry)
    }

    #[test]
    fn duplicate_adds_get_numbered_ids() {
        let (_dir, registry) = scratch_registry();
        let a = registry.add("127.0.0.1", 9999, "", BTreeMap::new());
        let b = registry.add("127.0.0.1", 9999, "", BTreeMap::new());
        let c = registry.add("127.0.0.1", 9999, "", BTreeMap::new());
        assert_eq!(a.id, "tcp:127.0.0.1:9999");
        assert_eq!(b.id, "tcp:127.0.0.1:9999:2");
        assert_eq!(c.id, "tcp:127.0.0.1:9999:3");
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn empty_name_defaults_to_host() {
        let (_dir, registry) = scratch_registry();
        let entry = registry.add("10.0.0.5", 4001, "", BTreeMap::new());
        assert_eq!(entry.name, "10.0.0.5");
    }

    #[test]
    fn patch_rekeys_on_host_port_change() {
        let (_dir, registry) = scratch_registry();
        let entry = registry.add("127.0.0.1", 9999, "Original", BTreeMap::new());
        let outcome = registry
            .patch(
                &entry.id,
                &SourcePatch {
                    host: Some("10.0.0.5".to_owned()),
                    port: Some(8888),
                    ..SourcePatch::default()
                },
            )
            .expect("patch");
        assert_eq!(outcome.entry.id, "tcp:10.0.0.5:8888");
        assert_eq!(outcome.entry.name, "Original");
        assert_eq!(outcome.replaced_id.as_deref(), Some("tcp:127.0.0.1:9999"));
        let ids: Vec<String> = registry.list().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["tcp:10.0.0.5:8888".to_owned()]);
    }

    #[test]
    fn patch_conflict_mutates_nothing() {
        let (_dir, registry) = scratch_registry();
        registry.add("127.0.0.1", 9999, "", BTreeMap::new());
        let second = registry.add("10.0.0.5", 8888, "", BTreeMap::new());
        let err = registry
            .patch(
                &second.id,
                &SourcePatch {
                    host: Some("127.0.0.1".to_owned()),
                    port: Some(9999),
                    ..SourcePatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, PatchError::Conflict);
        let entry = registry
            .list()
            .into_iter()
            .find(|e| e.id == second.id)
            .expect("second entry kept");
        assert_eq!(entry.host, "10.0.0.5");
        assert_eq!(entry.port, 8888);
    }

    #[test]
    fn patch_missing_id_is_not_found() {
        let (_dir, registry) = scratch_registry();
        let err = registry
            .patch("tcp:none:1", &SourcePatch::default())
            .unwrap_err();
        assert_eq!(err, PatchError::NotFound);
    }

    #[test]
    fn overrides_are_title_cased_and_filtered() {
        let raw = json!({
            "lacrosse": "gymnastics",
            "HOCKEY": "Track",
            "curling": "Soccer",
            "Soccer": "quidditch",
        });
        let normalized = normalize_sport_overrides(Some(&raw));
        assert_eq!(normalized.get("Lacrosse").map(String::as_str), Some("Gymnastics"));
        assert_eq!(normalized.get("Hockey").map(String::as_str), Some("Track"));
        assert_eq!(normalized.len(), 2);
    }

    #[test]
    fn override_lookup_returns_typed_sport() {
        let (_dir, registry) = scratch_registry();
        let overrides = normalize_sport_overrides(Some(&json!({"Lacrosse": "Gymnastics"})));
        let entry = registry.add("127.0.0.1", 9999, "", overrides);
        assert_eq!(
            registry.override_for(&entry.id, Sport::Lacrosse),
            Some(Sport::Gymnastics)
        );
        assert_eq!(registry.override_for(&entry.id, Sport::Hockey), None);
        assert_eq!(registry.override_for("tcp:none:1", Sport::Lacrosse), None);
    }

    #[test]
    fn persistence_round_trips_known_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data_sources.json");
        {
            let registry = SourceRegistry::load(&path);
            let overrides = normalize_sport_overrides(Some(&json!({"Lacrosse": "Gymnastics"})));
            registry.add("127.0.0.1", 9999, "Court A", overrides);
        }
        let registry = SourceRegistry::load(&path);
        let entries = registry.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "tcp:127.0.0.1:9999");
        assert_eq!(entries[0].name, "Court A");
        assert!(entries[0].enabled);
        assert_eq!(
            entries[0].sport_overrides.get("Lacrosse").map(String::as_str),
            Some("Gymnastics")
        );
    }

    #[test]
    fn malformed_entries_are_skipped_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data_sources.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "tcp:10.0.0.1:4001", "host": "10.0.0.1", "port": 4001},
                {"id": "", "host": "10.0.0.2", "port": 4001},
                {"id": "tcp:10.0.0.3:bad", "host": "10.0.0.3", "port": "not a port"},
                "not an object"
            ]"#,
        )
        .expect("write");
        let registry = SourceRegistry::load(&path);
        let entries = registry.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "tcp:10.0.0.1:4001");
        assert_eq!(entries[0].name, "tcp:10.0.0.1:4001");
    }
}
