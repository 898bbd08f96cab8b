//! Long-lived ingestion workers.
//!
//! Every worker owns its own [`PacketFramer`](oes_core::PacketFramer) and a
//! stop signal, and feeds decoded packets into the engine tagged with its
//! source id. Workers never take each other down: a connection error is
//! that worker's problem alone.
//!
//! Shutdown uses a `watch` channel: the stop side flips it to `true`, the
//! worker's `select!` loop notices within one tick, closes its socket and
//! returns. The stop side joins with a two-second bound and abandons a
//! worker that does not make it; the signal stays set, so a straggler
//! still exits on its next wakeup.

pub mod listeners;
pub mod serial;
pub mod tcp_client;

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Socket read buffer size shared by the network workers.
pub(crate) const READ_BUFFER: usize = 4096;

/// Bound on how long a stop waits for its worker to exit.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to one running worker: the stop signal plus, for tokio tasks,
/// the join handle. The serial reader runs on a plain thread whose 1 s
/// read timeout bounds its exit, so it carries no join handle.
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn new(stop: watch::Sender<bool>, task: JoinHandle<()>) -> Self {
        WorkerHandle {
            stop,
            task: Some(task),
        }
    }

    pub fn detached(stop: watch::Sender<bool>) -> Self {
        WorkerHandle { stop, task: None }
    }

    /// Signal the worker to stop and wait briefly for it to exit. A worker
    /// that overruns the bound is abandoned, not aborted; it will see the
    /// signal on its next tick.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task {
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, task).await.is_err() {
                warn!("worker did not stop within the join bound; abandoning");
            }
        }
    }
}

/// Fresh stop-signal pair for a new worker.
pub fn stop_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}
