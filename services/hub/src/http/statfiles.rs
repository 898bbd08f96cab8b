//! Stats-file watcher endpoints.

use crate::engine::Engine;
use crate::http::response::{empty_not_found, json_error};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oes_core::Sport;
use serde_json::{Value, json};

/// `GET /statcrew_config/{sport}`
pub async fn get_config(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = Sport::normalize(&sport) else {
        return json_error(StatusCode::NOT_FOUND, "unsupported sport");
    };
    Json(engine.statfiles.get_config(sport).await).into_response()
}

/// `POST /statcrew_config/{sport}`
pub async fn update_config(
    State(engine): State<Engine>,
    Path(sport): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(sport) = Sport::normalize(&sport) else {
        return json_error(StatusCode::NOT_FOUND, "unsupported sport");
    };
    let payload = body.as_object().cloned().unwrap_or_default();
    Json(engine.statfiles.update_config(sport, &payload).await).into_response()
}

/// `GET /get_statcrew_data/{sport}`
pub async fn get_data(State(engine): State<Engine>, Path(sport): Path<String>) -> Response {
    let Some(sport) = Sport::normalize(&sport) else {
        return empty_not_found();
    };
    Json(Value::Object(engine.statfiles.get_data(sport).await)).into_response()
}

/// `POST /reset_baseball_state` — clear the inning trackers (all sources,
/// or one via `{"source": "<id>"}`) so the next packet re-bootstraps.
pub async fn reset_baseball(
    State(engine): State<Engine>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let source = body
        .get("source")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    engine.store.reset_baseball(source.as_deref());
    Json(json!({ "status": "reset" }))
}
