//! Inbound network listeners.
//!
//! Consoles (or relays in front of them) can push the scoreboard stream
//! at the hub instead of being dialed. The TCP listener accepts
//! connections and spawns a reader per peer; the UDP listener reframes
//! each datagram. Sources are tagged `tcp:<peer-ip>:<peer-port>` /
//! `udp:<peer-ip>:<peer-port>`, so every remote endpoint is its own
//! source in the store.

use crate::config::IngestMode;
use crate::engine::Engine;
use crate::ingest::{READ_BUFFER, WorkerHandle, stop_channel};
use oes_core::PacketFramer;
use std::net::SocketAddr;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Addresses the listeners actually bound (pass port 0 to let the OS
/// choose, useful in tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundListeners {
    pub tcp: Option<SocketAddr>,
    pub udp: Option<SocketAddr>,
}

/// Bind and spawn the listeners selected by `mode`. A bind failure logs
/// and skips that listener; the other still runs.
pub async fn start(
    engine: &Engine,
    tcp_port: u16,
    udp_port: u16,
    mode: IngestMode,
) -> (BoundListeners, Vec<WorkerHandle>) {
    let mut bound = BoundListeners::default();
    let mut handles = Vec::new();

    if mode.wants_tcp() {
        match TcpListener::bind(("0.0.0.0", tcp_port)).await {
            Ok(listener) => {
                bound.tcp = listener.local_addr().ok();
                info!(port = bound.tcp.map_or(tcp_port, |a| a.port()), "tcp listener bound");
                let (stop_tx, stop_rx) = stop_channel();
                let task = tokio::spawn(tcp_accept_loop(engine.clone(), listener, stop_rx));
                handles.push(WorkerHandle::new(stop_tx, task));
            }
            Err(e) => {
                warn!(port = tcp_port, error = %e, "failed to start tcp listener");
            }
        }
    }

    if mode.wants_udp() {
        match UdpSocket::bind(("0.0.0.0", udp_port)).await {
            Ok(socket) => {
                bound.udp = socket.local_addr().ok();
                info!(port = bound.udp.map_or(udp_port, |a| a.port()), "udp listener bound");
                let (stop_tx, stop_rx) = stop_channel();
                let task = tokio::spawn(udp_loop(engine.clone(), socket, stop_rx));
                handles.push(WorkerHandle::new(stop_tx, task));
            }
            Err(e) => {
                warn!(port = udp_port, error = %e, "failed to start udp listener");
            }
        }
    }

    (bound, handles)
}

async fn tcp_accept_loop(engine: Engine, listener: TcpListener, mut stop: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "scoreboard connection accepted");
                        // Per-connection readers share the listener's stop
                        // signal so one shutdown tears down everything.
                        tokio::spawn(connection_reader(engine.clone(), stream, peer, stop.clone()));
                    }
                    Err(e) => {
                        warn!(error = %e, "tcp accept error");
                        break;
                    }
                }
            }
        }
    }
    debug!("tcp listener stopped");
}

async fn connection_reader(
    engine: Engine,
    mut stream: TcpStream,
    peer: SocketAddr,
    mut stop: watch::Receiver<bool>,
) {
    let source_id = format!("tcp:{}:{}", peer.ip(), peer.port());
    let mut framer = PacketFramer::new();
    let mut buf = [0u8; READ_BUFFER];
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => {
                if *stop.borrow() {
                    break;
                }
            }
            read = stream.read(&mut buf) => {
                match read {
                    Ok(0) => break,
                    Ok(n) => {
                        for packet in framer.feed(&buf[..n]) {
                            engine.handle_packet(&packet, &source_id);
                        }
                    }
                    Err(e) => {
                        warn!(source_id = %source_id, error = %e, "read error");
                        break;
                    }
                }
            }
        }
    }
    debug!(source_id = %source_id, "connection reader stopped");
}

async fn udp_loop(engine: Engine, socket: UdpSocket, mut stop: watch::Receiver<bool>) {
    let mut framer = PacketFramer::new();
    let mut buf = [0u8; READ_BUFFER];
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
                    Ok((n, peer)) => {
                        let source_id = format!("udp:{}:{}", peer.ip(), peer.port());
                        for packet in framer.feed(&buf[..n]) {
                            engine.handle_packet(&packet, &source_id);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "udp receive error");
                        break;
                    }
                }
            }
        }
    }
    debug!("udp listener stopped");
}
