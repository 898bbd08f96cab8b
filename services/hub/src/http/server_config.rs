//! Runtime ingestion-mode switching.

use crate::config::IngestMode;
use crate::engine::Engine;
use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

/// `POST /update_server_config`
///
/// Tears down the serial reader and the network listeners, then brings up
/// whatever the requested mode asks for. Ports default to the
/// environment-configured values.
pub async fn update_server_config(
    State(engine): State<Engine>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mode = body
        .get("source")
        .and_then(Value::as_str)
        .map(IngestMode::parse)
        .unwrap_or(IngestMode::Auto);
    let serial_port = body
        .get("port")
        .and_then(Value::as_str)
        .unwrap_or(&engine.cfg.serial_port)
        .to_owned();
    let tcp_port = port_or(&body, "tcp_port", engine.cfg.scoreboard_tcp_port);
    let udp_port = port_or(&body, "udp_port", engine.cfg.scoreboard_udp_port);

    engine.stop_serial_reader().await;
    engine.stop_network_listeners().await;

    match mode {
        IngestMode::Serial => engine.start_serial_reader(serial_port.clone()).await,
        mode => {
            engine
                .start_network_listeners(tcp_port, udp_port, mode)
                .await;
        }
    }

    Json(json!({
        "status": "Server config updated",
        "source": mode.as_str(),
        "tcp_port": tcp_port,
        "udp_port": udp_port,
        "serial_port": serial_port,
    }))
}

fn port_or(body: &Value, key: &str, default: u16) -> u16 {
    body.get(key)
        .and_then(crate::registry::parse_port)
        .unwrap_or(default)
}
