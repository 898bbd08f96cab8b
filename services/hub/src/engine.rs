//! The engine: every piece of shared state, packaged as one value.
//!
//! Constructed once at startup and cloned (cheaply, all `Arc`s) into each
//! worker and HTTP handler; there are no process-wide singletons. Lock
//! ordering is registry first, store second, everywhere.

use crate::config::{HubConfig, IngestMode};
use crate::ingest::listeners::BoundListeners;
use crate::ingest::{self, WorkerHandle, stop_channel};
use crate::registry::{SourceEntry, SourceRegistry};
use crate::statfiles::StatFileManager;
use crate::store::{PURGE_INTERVAL, SnapshotStore, SourceActivity};
use crate::trackman::TrackmanManager;
use crate::virtius::VirtiusManager;
use oes_core::snapshot::ClockOnly;
use oes_core::{Snapshot, Sport, decode_packet};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Outbound clients keyed by source id, plus the inbound listeners and
/// the serial reader. Worker start/stop always goes through here so an
/// already-running id is a no-op.
#[derive(Default)]
pub struct WorkerSet {
    tcp_clients: Mutex<HashMap<String, WorkerHandle>>,
    listeners: Mutex<Vec<WorkerHandle>>,
    serial: Mutex<Option<WorkerHandle>>,
}

#[derive(Clone)]
pub struct Engine {
    pub cfg: Arc<HubConfig>,
    pub store: Arc<SnapshotStore>,
    pub registry: Arc<SourceRegistry>,
    pub workers: Arc<WorkerSet>,
    pub statfiles: StatFileManager,
    pub trackman: TrackmanManager,
    pub virtius: VirtiusManager,
}

impl Engine {
    pub fn new(cfg: HubConfig) -> Engine {
        let cfg = Arc::new(cfg);
        Engine {
            store: Arc::new(SnapshotStore::new()),
            registry: Arc::new(SourceRegistry::load(cfg.sources_file.clone())),
            workers: Arc::new(WorkerSet::default()),
            statfiles: StatFileManager::new(cfg.statcrew_file.clone()),
            trackman: TrackmanManager::new(),
            virtius: VirtiusManager::new(cfg.virtius_file.clone()),
            cfg,
        }
    }

    /// Bring up everything the persisted configuration asks for: outbound
    /// workers for enabled sources, file watchers, session pollers, the
    /// listeners for the configured ingest mode, and the purge task.
    pub async fn startup(&self) {
        for entry in self.registry.list() {
            if entry.enabled {
                self.start_tcp_client(&entry).await;
            }
        }
        self.statfiles.start_configured().await;
        self.virtius.start_configured().await;
        match self.cfg.ingest_mode {
            IngestMode::Serial => self.start_serial_reader(self.cfg.serial_port.clone()).await,
            mode => {
                self.start_network_listeners(
                    self.cfg.scoreboard_tcp_port,
                    self.cfg.scoreboard_udp_port,
                    mode,
                )
                .await;
            }
        }
        self.spawn_purge_task();
    }

    // -----------------------------------------------------------------
    // Packet path
    // -----------------------------------------------------------------

    /// Decode one framed packet, apply any per-source sport override, and
    /// store the result. Unrecognized packets are dropped silently.
    pub fn handle_packet(&self, packet: &[u8], source_id: &str) {
        let Some((sport, snapshot)) = decode_packet(packet) else {
            return;
        };
        let (sport, snapshot) = self.apply_sport_override(sport, snapshot, source_id);
        self.store.record(sport, snapshot, source_id);
    }

    fn apply_sport_override(
        &self,
        sport: Sport,
        snapshot: Snapshot,
        source_id: &str,
    ) -> (Sport, Snapshot) {
        let Some(replacement) = self.registry.override_for(source_id, sport) else {
            return (sport, snapshot);
        };
        // The one rewrite with its own shape: gymnastics graphics driven
        // by a lacrosse console only want the running clock.
        let snapshot = match (sport, replacement, snapshot) {
            (Sport::Lacrosse, Sport::Gymnastics, Snapshot::Lacrosse(lax)) => {
                Snapshot::ClockOnly(ClockOnly {
                    game_clock: lax.game_clock,
                })
            }
            (_, _, snapshot) => snapshot,
        };
        (replacement, snapshot)
    }

    /// Activity summary for the read API. Registry lock first, store lock
    /// second; no code path takes them in the other order.
    pub fn sources_snapshot(&self) -> Vec<SourceActivity> {
        let names = self.registry.names_by_id();
        self.store.sources_snapshot(&names)
    }

    // -----------------------------------------------------------------
    // Outbound TCP workers
    // -----------------------------------------------------------------

    /// Start the outbound worker for a configured source. Starting an
    /// already-running id is a no-op.
    pub async fn start_tcp_client(&self, entry: &SourceEntry) {
        let mut clients = self.workers.tcp_clients.lock().await;
        if clients.contains_key(&entry.id) {
            return;
        }
        let (stop_tx, stop_rx) = stop_channel();
        let task = tokio::spawn(ingest::tcp_client::run(
            self.clone(),
            entry.clone(),
            stop_rx,
        ));
        clients.insert(entry.id.clone(), WorkerHandle::new(stop_tx, task));
    }

    /// Stop (and forget) the outbound worker for a source id.
    pub async fn stop_tcp_client(&self, source_id: &str) {
        let handle = self.workers.tcp_clients.lock().await.remove(source_id);
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    // -----------------------------------------------------------------
    // Inbound listeners and serial
    // -----------------------------------------------------------------

    pub async fn start_network_listeners(
        &self,
        tcp_port: u16,
        udp_port: u16,
        mode: IngestMode,
    ) -> BoundListeners {
        let (bound, handles) = ingest::listeners::start(self, tcp_port, udp_port, mode).await;
        self.workers.listeners.lock().await.extend(handles);
        bound
    }

    pub async fn stop_network_listeners(&self) {
        let handles: Vec<WorkerHandle> = self.workers.listeners.lock().await.drain(..).collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }

    pub async fn start_serial_reader(&self, port: String) {
        self.stop_serial_reader().await;
        let (stop_tx, stop_rx) = stop_channel();
        ingest::serial::spawn(self.clone(), port, stop_rx);
        *self.workers.serial.lock().await = Some(WorkerHandle::detached(stop_tx));
    }

    pub async fn stop_serial_reader(&self) {
        if let Some(handle) = self.workers.serial.lock().await.take() {
            handle.shutdown().await;
        }
    }

    // -----------------------------------------------------------------
    // Background maintenance
    // -----------------------------------------------------------------

    /// Spawn the stale-source purge loop. Runs for the life of the
    /// process; errors cannot escape it.
    pub fn spawn_purge_task(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PURGE_INTERVAL);
            // interval fires immediately; the first purge should wait a
            // full period.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.purge_stale();
            }
        });
    }
}
