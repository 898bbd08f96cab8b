//! Snapshot read endpoints.

use crate::engine::Engine;
use axum::Json;
use axum::extract::{Path, Query, State};
use oes_core::Sport;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Deserialize)]
pub struct RawDataQuery {
    pub source: Option<String>,
}

/// `GET /get_raw_data/{sport}?source=<id>`
///
/// An unknown sport (or one with nothing stored) reads as `{}`; that is
/// "nothing yet", not an error.
pub async fn get_raw_data(
    State(engine): State<Engine>,
    Path(sport): Path<String>,
    Query(query): Query<RawDataQuery>,
) -> Json<Value> {
    let Some(sport) = Sport::normalize(&sport) else {
        return Json(json!({}));
    };
    Json(Value::Object(
        engine.store.get(sport, query.source.as_deref()),
    ))
}

/// `GET /get_sources`
pub async fn get_sources(State(engine): State<Engine>) -> Json<Value> {
    Json(json!({ "sources": engine.sources_snapshot() }))
}
