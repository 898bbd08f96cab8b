// hub: scoreboard ingestion engine + HTTP read API.

use hub::Engine;
use hub::config::load_config;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let cfg = load_config();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = cfg.ingest_mode.as_str(),
        tcp_port = cfg.scoreboard_tcp_port,
        udp_port = cfg.scoreboard_udp_port,
        "hub starting"
    );

    let engine = Engine::new(cfg);
    engine.startup().await;

    let router = hub::build_router(engine.clone());
    let listener = tokio::net::TcpListener::bind(&engine.cfg.bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %engine.cfg.bind_addr, "hub listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    info!("hub shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        _ = terminate => {},
    }
}
