//! Real-time sports-score ingestion hub.
//!
//! Scoreboard consoles feed the hub over serial, outbound TCP, inbound
//! TCP and UDP; packets are reframed, decoded per sport, and cached as
//! latest-value snapshots that the HTTP API serves to broadcast graphics.
//! A second path watches statistics-crew XML files and external session
//! feeds. See `engine::Engine` for the shared state, `ingest` for the
//! workers, and `http` for the API surface.

pub mod config;
pub mod engine;
pub mod http;
pub mod ingest;
pub mod registry;
pub mod statfiles;
pub mod store;
pub mod trackman;
pub mod virtius;

pub use engine::Engine;

use axum::Router;
use axum::routing::{delete, get, post};

pub fn build_router(engine: Engine) -> Router {
    Router::new()
        .route("/get_raw_data/{sport}", get(http::data::get_raw_data))
        .route("/get_sources", get(http::data::get_sources))
        .route(
            "/data_sources",
            get(http::sources::list_sources).post(http::sources::add_source),
        )
        .route(
            "/data_sources/{id}",
            delete(http::sources::delete_source).patch(http::sources::patch_source),
        )
        .route(
            "/update_server_config",
            post(http::server_config::update_server_config),
        )
        .route(
            "/statcrew_config/{sport}",
            get(http::statfiles::get_config).post(http::statfiles::update_config),
        )
        .route("/get_statcrew_data/{sport}", get(http::statfiles::get_data))
        .route(
            "/reset_baseball_state",
            post(http::statfiles::reset_baseball),
        )
        .route("/get_trackman_data/{sport}", get(http::trackman::get_data))
        .route("/get_trackman_debug/{sport}", get(http::trackman::get_debug))
        .route(
            "/trackman_config/{sport}",
            get(http::trackman::get_config).post(http::trackman::update_config),
        )
        .route("/get_virtius_data/{sport}", get(http::virtius::get_data))
        .route(
            "/virtius_config/{sport}",
            get(http::virtius::get_config).post(http::virtius::update_config),
        )
        .with_state(engine)
}
