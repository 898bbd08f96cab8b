//! Radar feed endpoints. Only baseball and softball are radar-capable;
//! everything else 404s through the normalizer.

use crate::engine::Engine;
use crate::http::response::{bad_request, conflict, empty_not_found, json_error};
use crate::trackman::{ConfigError, normalize_sport};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// `GET /get_trackman_data/{sport}`
pub async fn get_data(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return empty_not_found();
    };
    Json(Value::Object(engine.trackman.get_data(sport).await)).into_response()
}

/// `GET /get_trackman_debug/{sport}`
pub async fn get_debug(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return empty_not_found();
    };
    Json(engine.trackman.get_debug(sport).await).into_response()
}

/// `GET /trackman_config/{sport}`
pub async fn get_config(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return json_error(StatusCode::NOT_FOUND, "unsupported sport");
    };
    Json(engine.trackman.get_config(sport).await).into_response()
}

/// `POST /trackman_config/{sport}`
pub async fn update_config(
    State(engine): State<Engine>,
    Path(sport): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return json_error(StatusCode::NOT_FOUND, "unsupported sport");
    };
    let payload = body.as_object().cloned().unwrap_or_default();
    match engine.trackman.update_config(sport, &payload).await {
        Ok(updated) => Json(updated).into_response(),
        Err(ConfigError::InvalidPort) => bad_request("invalid port"),
        Err(ConfigError::InvalidFeedType) => bad_request("invalid feed type"),
        Err(ConfigError::PortInUse) => conflict("port already in use"),
    }
}
