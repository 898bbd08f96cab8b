//! Latest-value snapshot store.
//!
//! Three maps under one mutex: the newest snapshot per sport, the newest
//! snapshot per (source, sport), and a last-seen timestamp per source.
//! Writes replace whole snapshots, so readers always see a coherent record;
//! reads copy out. The per-source baseball inning state lives under the
//! same lock because enrichment must be atomic with the write.
//!
//! There is no history. A source that goes quiet for an hour is purged
//! from all three maps in one step by the background purge task.

use oes_core::inning::{InningTracker, display};
use oes_core::{Snapshot, Sport};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Sources quiet for longer than this are dropped by a purge pass.
pub const STALE_TTL: Duration = Duration::from_secs(3600);
/// Cadence of the background purge task.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Wall-clock seconds since the Unix epoch, as the wire API reports them.
pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Per-source activity summary for the read API.
#[derive(Debug, Clone, Serialize)]
pub struct SourceActivity {
    pub source: String,
    pub name: String,
    pub last_seen: f64,
    pub age_seconds: f64,
    pub sports: Vec<&'static str>,
}

#[derive(Default)]
struct StoreInner {
    by_sport: HashMap<Sport, Map<String, Value>>,
    by_source: HashMap<String, HashMap<Sport, Map<String, Value>>>,
    last_seen: HashMap<String, f64>,
    innings: InningTracker,
}

/// Thread-safe latest-value cache shared by every worker and the HTTP
/// layer.
#[derive(Default)]
pub struct SnapshotStore {
    inner: Mutex<StoreInner>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoded snapshot for `(sport, source_id)`, overwriting any
    /// previous record. Baseball snapshots are enriched with the inning
    /// state machine before the write; both happen under the one lock.
    pub fn record(&self, sport: Sport, snapshot: Snapshot, source_id: &str) {
        let now = epoch_seconds();
        let mut inner = self.inner.lock().expect("store lock");

        let snapshot = match snapshot {
            Snapshot::Baseball(mut b) => {
                let (half, inning) = inner.innings.advance(source_id, &b);
                b.half = Some(half);
                b.inning = Some(inning);
                b.inning_display = Some(display(half, inning));
                Snapshot::Baseball(b)
            }
            other => other,
        };

        let Ok(Value::Object(mut map)) = serde_json::to_value(&snapshot) else {
            warn!(sport = %sport, "snapshot did not serialize to an object; dropped");
            return;
        };
        map.insert(
            "_meta".to_owned(),
            json!({ "source": source_id, "received_at": now }),
        );

        inner.by_sport.insert(sport, map.clone());
        inner
            .by_source
            .entry(source_id.to_owned())
            .or_default()
            .insert(sport, map);
        let seen = inner.last_seen.entry(source_id.to_owned()).or_insert(now);
        // Keep last-seen monotonic even if the wall clock steps back.
        *seen = seen.max(now);
    }

    /// Copy out the latest snapshot for a sport, optionally pinned to one
    /// source. Absent data reads as an empty mapping, not an error.
    pub fn get(&self, sport: Sport, source_id: Option<&str>) -> Map<String, Value> {
        let inner = self.inner.lock().expect("store lock");
        match source_id {
            Some(id) => inner
                .by_source
                .get(id)
                .and_then(|per_sport| per_sport.get(&sport))
                .cloned()
                .unwrap_or_default(),
            None => inner.by_sport.get(&sport).cloned().unwrap_or_default(),
        }
    }

    /// Activity summary of every live source, with display names joined in
    /// by the caller (registry lock is always taken before the store lock).
    pub fn sources_snapshot(&self, names: &HashMap<String, String>) -> Vec<SourceActivity> {
        let now = epoch_seconds();
        let inner = self.inner.lock().expect("store lock");
        let mut activity: Vec<SourceActivity> = inner
            .last_seen
            .iter()
            .map(|(source, &last_seen)| SourceActivity {
                source: source.clone(),
                name: names.get(source).cloned().unwrap_or_else(|| source.clone()),
                last_seen,
                age_seconds: ((now - last_seen) * 1000.0).round() / 1000.0,
                sports: inner
                    .by_source
                    .get(source)
                    .map(|per_sport| per_sport.keys().map(|s| s.name()).collect())
                    .unwrap_or_default(),
            })
            .collect();
        activity.sort_by(|a, b| a.source.cmp(&b.source));
        activity
    }

    /// Drop every source not seen within [`STALE_TTL`] from all three maps.
    pub fn purge_stale(&self) {
        self.purge_stale_at(epoch_seconds());
    }

    fn purge_stale_at(&self, now: f64) {
        let cutoff = now - STALE_TTL.as_secs_f64();
        let mut inner = self.inner.lock().expect("store lock");
        let stale: Vec<String> = inner
            .last_seen
            .iter()
            .filter(|&(_, &ts)| ts < cutoff)
            .map(|(source, _)| source.clone())
            .collect();
        for source in &stale {
            inner.last_seen.remove(source);
            inner.by_source.remove(source);
            inner.innings.reset(Some(source));
        }
        inner.by_sport.retain(|_, snapshot| {
            snapshot
                .get("_meta")
                .and_then(|meta| meta.get("source"))
                .and_then(Value::as_str)
                .is_none_or(|source| !stale.iter().any(|s| s == source))
        });
    }

    /// Reset the inning state machine for one source, or all of them.
    pub fn reset_baseball(&self, source_id: Option<&str>) {
        self.inner
            .lock()
            .expect("store lock")
            .innings
            .reset(source_id);
    }

    #[cfg(test)]
    fn force_last_seen(&self, source_id: &str, ts: f64) {
        self.inner
            .lock()
            .expect("store lock")
            .last_seen
            .insert(source_id.to_owned(), ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oes_core::inning::Half;
    use oes_core::snapshot::{Baseball, Basketball, Fault};

    fn basketball(home_score: &str) -> Snapshot {
        Snapshot::Basketball(Basketball {
            game_clock: "12:34".to_owned(),
            period: "2".to_owned(),
            home_score: home_score.to_owned(),
            visitor_score: "38".to_owned(),
            home_full_tol: "3".to_owned(),
            visitor_full_tol: "2".to_owned(),
            home_20_tol: 0,
            visitor_20_tol: 0,
            home_fouls: "5".to_owned(),
            visitor_fouls: "3".to_owned(),
            shot_clock: "24".to_owned(),
            home_bonus: false,
            visitor_bonus: false,
            possession: None,
        })
    }

    fn baseball(outs: &str) -> Snapshot {
        let blank = || std::array::from_fn(|_| " ".to_owned());
        Snapshot::Baseball(Baseball {
            away_innings: blank(),
            home_innings: blank(),
            balls: "0".to_owned(),
            strikes: "0".to_owned(),
            outs: outs.to_owned(),
            batter_num: " 1".to_owned(),
            pitch_speed: "000".to_owned(),
            away_runs: " 0".to_owned(),
            away_hits: " 0".to_owned(),
            away_errors: " 0".to_owned(),
            home_runs: " 0".to_owned(),
            home_hits: " 0".to_owned(),
            home_errors: " 0".to_owned(),
            inning: None,
            half: None,
            inning_display: None,
        })
    }

    #[test]
    fn record_and_get_with_meta() {
        let store = SnapshotStore::new();
        store.record(Sport::Basketball, basketball("45"), "test:1");
        let got = store.get(Sport::Basketball, None);
        assert_eq!(got["home_score"], "45");
        assert_eq!(got["_meta"]["source"], "test:1");
        assert!(got["_meta"]["received_at"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn per_source_reads_are_isolated() {
        let store = SnapshotStore::new();
        store.record(Sport::Basketball, basketball("10"), "src:A");
        store.record(Sport::Basketball, basketball("20"), "src:B");
        assert_eq!(store.get(Sport::Basketball, Some("src:A"))["home_score"], "10");
        assert_eq!(store.get(Sport::Basketball, Some("src:B"))["home_score"], "20");
        // Aggregate read sees the most recent write.
        assert_eq!(store.get(Sport::Basketball, None)["home_score"], "20");
    }

    #[test]
    fn successive_records_observed_in_order() {
        let store = SnapshotStore::new();
        for score in ["10", "12", "14"] {
            store.record(Sport::Basketball, basketball(score), "src:A");
            assert_eq!(store.get(Sport::Basketball, Some("src:A"))["home_score"], score);
        }
    }

    #[test]
    fn missing_data_reads_as_empty() {
        let store = SnapshotStore::new();
        assert!(store.get(Sport::Hockey, None).is_empty());
        assert!(store.get(Sport::Hockey, Some("nobody")).is_empty());
    }

    #[test]
    fn fault_snapshots_are_stored() {
        let store = SnapshotStore::new();
        store.record(
            Sport::Soccer,
            Snapshot::Fault(Fault {
                error: "Soccer parse error: byte 26 out of range".to_owned(),
            }),
            "src:bad",
        );
        let got = store.get(Sport::Soccer, None);
        assert!(got["error"].as_str().unwrap().contains("parse error"));
    }

    #[test]
    fn sources_snapshot_joins_names() {
        let store = SnapshotStore::new();
        store.record(Sport::Hockey, basketball("3"), "src:X");
        let mut names = HashMap::new();
        names.insert("src:X".to_owned(), "Rink feed".to_owned());
        let sources = store.sources_snapshot(&names);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "src:X");
        assert_eq!(sources[0].name, "Rink feed");
        assert!(sources[0].sports.contains(&"Hockey"));
        assert!(sources[0].age_seconds >= 0.0);
    }

    #[test]
    fn purge_drops_stale_sources_from_all_maps() {
        let store = SnapshotStore::new();
        store.record(Sport::Soccer, basketball("1"), "old:src");
        store.record(Sport::Soccer, basketball("2"), "fresh:src");
        store.force_last_seen("old:src", epoch_seconds() - 7200.0);

        store.purge_stale();

        let sources = store.sources_snapshot(&HashMap::new());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "fresh:src");
        assert!(store.get(Sport::Soccer, Some("old:src")).is_empty());
        // The aggregate map keeps the fresh record.
        assert_eq!(store.get(Sport::Soccer, None)["_meta"]["source"], "fresh:src");
    }

    #[test]
    fn purge_drops_aggregate_record_of_stale_source() {
        let store = SnapshotStore::new();
        store.record(Sport::Soccer, basketball("1"), "old:src");
        store.force_last_seen("old:src", epoch_seconds() - 7200.0);
        store.purge_stale();
        assert!(store.get(Sport::Soccer, None).is_empty());
    }

    #[test]
    fn purge_keeps_fresh_sources() {
        let store = SnapshotStore::new();
        store.record(Sport::Soccer, basketball("1"), "fresh:src");
        store.purge_stale();
        assert_eq!(store.sources_snapshot(&HashMap::new()).len(), 1);
    }

    #[test]
    fn baseball_records_are_enriched_under_the_lock() {
        let store = SnapshotStore::new();
        store.record(Sport::Baseball, baseball("0"), "t");
        let got = store.get(Sport::Baseball, None);
        assert_eq!(got["half"], "TOP");
        assert_eq!(got["inning"], 1);
        assert_eq!(got["inning_display"], "TOP 1st");

        store.record(Sport::Baseball, baseball("3"), "t");
        let got = store.get(Sport::Baseball, None);
        assert_eq!(got["inning_display"], "MID 1st");
    }

    #[test]
    fn baseball_reset_rebootstraps() {
        let store = SnapshotStore::new();
        store.record(Sport::Baseball, baseball("3"), "t");
        store.reset_baseball(None);
        store.record(Sport::Baseball, baseball("0"), "t");
        let got = store.get(Sport::Baseball, None);
        assert_eq!(got["half"], "TOP");
        assert_eq!(got["inning"], 1);
    }

    #[test]
    fn half_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Half::Mid).unwrap(), "MID");
    }
}
