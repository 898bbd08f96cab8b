//! Session feed endpoints (gymnastics only).

use crate::engine::Engine;
use crate::http::response::{empty_not_found, json_error};
use crate::virtius::normalize_sport;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

/// `GET /get_virtius_data/{sport}`
pub async fn get_data(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return empty_not_found();
    };
    Json(Value::Object(engine.virtius.get_data(sport).await)).into_response()
}

/// `GET /virtius_config/{sport}`
pub async fn get_config(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return json_error(StatusCode::NOT_FOUND, "unsupported sport");
    };
    Json(engine.virtius.get_config(sport).await).into_response()
}

/// `POST /virtius_config/{sport}`
pub async fn update_config(
    State(engine): State<Engine>,
    Path(sport): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(sport) = normalize_sport(&sport) else {
        return json_error(StatusCode::NOT_FOUND, "unsupported sport");
    };
    let payload = body.as_object().cloned().unwrap_or_default();
    Json(engine.virtius.update_config(sport, &payload).await).into_response()
}
