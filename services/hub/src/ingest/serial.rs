//! Serial-port reader.
//!
//! Serial I/O is blocking, so this worker runs on a plain thread with a
//! one-second read timeout as its tick; it checks the stop signal between
//! reads and exits on its own once signalled. Open or read failures end
//! the worker (there is no reopen loop; the operator re-selects the port
//! through the server-config endpoint).

use crate::engine::Engine;
use oes_core::PacketFramer;
use std::io::Read;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const BAUD_RATE: u32 = 9600;
const READ_TIMEOUT: Duration = Duration::from_secs(1);
const READ_CHUNK: usize = 256;

/// Spawn the reader thread for `port` (e.g. `COM3`, `/dev/ttyUSB0`).
pub fn spawn(engine: Engine, port: String, stop: watch::Receiver<bool>) {
    std::thread::spawn(move || read_port(&engine, &port, &stop));
}

fn read_port(engine: &Engine, port: &str, stop: &watch::Receiver<bool>) {
    // 9600-8N1 is the console's fixed framing.
    let mut serial = match serialport::new(port, BAUD_RATE)
        .timeout(READ_TIMEOUT)
        .open()
    {
        Ok(serial) => serial,
        Err(e) => {
            warn!(port = %port, error = %e, "failed to open serial port");
            return;
        }
    };
    info!(port = %port, "serial reader started");

    let source_id = format!("serial:{port}");
    let mut framer = PacketFramer::new();
    let mut buf = [0u8; READ_CHUNK];

    while !*stop.borrow() {
        match serial.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => {
                for packet in framer.feed(&buf[..n]) {
                    engine.handle_packet(&packet, &source_id);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!(port = %port, error = %e, "serial read error");
                break;
            }
        }
    }
    debug!(port = %port, "serial reader stopped");
}
