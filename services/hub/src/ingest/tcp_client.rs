//! Outbound TCP client worker.
//!
//! Dials a configured scoreboard console and keeps the connection alive
//! for the life of the worker: read, reframe, decode, store. A dropped or
//! refused connection backs off exponentially (1 s doubling to a 10 s
//! cap, reset after a successful connect) and retries until stopped.

use crate::engine::Engine;
use crate::registry::SourceEntry;
use oes_core::PacketFramer;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

pub async fn run(engine: Engine, source: SourceEntry, mut stop: watch::Receiver<bool>) {
    let mut framer = PacketFramer::new();
    let mut backoff = INITIAL_BACKOFF;

    while !*stop.borrow() {
        match tokio::time::timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((source.host.as_str(), source.port)),
        )
        .await
        {
            Ok(Ok(stream)) => {
                info!(source_id = %source.id, "connected to scoreboard source");
                backoff = INITIAL_BACKOFF;
                read_loop(&engine, &source.id, stream, &mut framer, &mut stop).await;
            }
            Ok(Err(e)) => {
                warn!(source_id = %source.id, error = %e, "connect failed");
            }
            Err(_) => {
                warn!(source_id = %source.id, "connect timed out");
            }
        }

        if *stop.borrow() {
            break;
        }
        // Cancellable backoff wait.
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
    debug!(source_id = %source.id, "tcp client stopped");
}

async fn read_loop(
    engine: &Engine,
    source_id: &str,
    mut stream: TcpStream,
    framer: &mut PacketFramer,
    stop: &mut watch::Receiver<bool>,
) {
    let mut buf = [0u8; super::READ_BUFFER];
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    return;
                }
            }
            read = stream.read(&mut buf) => {
                match read {
                    Ok(0) => {
                        info!(source_id = %source_id, "scoreboard source closed the connection");
                        return;
                    }
                    Ok(n) => {
                        for packet in framer.feed(&buf[..n]) {
                            engine.handle_packet(&packet, source_id);
                        }
                    }
                    Err(e) => {
                        warn!(source_id = %source_id, error = %e, "read error");
                        return;
                    }
                }
            }
        }
    }
}
