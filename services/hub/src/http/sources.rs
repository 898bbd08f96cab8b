//! Outbound-source registry endpoints.

use crate::engine::Engine;
use crate::http::response::{bad_request, conflict, not_found};
use crate::registry::{PatchError, SourcePatch, normalize_sport_overrides, parse_port};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// `GET /data_sources`
pub async fn list_sources(State(engine): State<Engine>) -> Json<Value> {
    Json(json!({ "sources": engine.registry.list() }))
}

/// `POST /data_sources`
///
/// Always succeeds for a valid host/port; a duplicate endpoint gets a
/// `:2`, `:3`… suffixed id rather than a conflict.
pub async fn add_source(State(engine): State<Engine>, Json(body): Json<Value>) -> Response {
    let host = body
        .get("host")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    let Some(port_value) = body.get("port").filter(|port| !port.is_null()) else {
        return bad_request("host and port required");
    };
    if host.is_empty() {
        return bad_request("host and port required");
    }
    let Some(port) = parse_port(port_value) else {
        return bad_request("invalid port");
    };
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(host);
    let overrides = normalize_sport_overrides(body.get("sport_overrides"));

    let entry = engine.registry.add(host, port, name, overrides);
    engine.start_tcp_client(&entry).await;
    Json(json!({ "status": "added", "source": entry })).into_response()
}

/// `DELETE /data_sources/{id}`
pub async fn delete_source(State(engine): State<Engine>, Path(id): Path<String>) -> Response {
    let id = id.trim();
    if id.is_empty() {
        return bad_request("source id required");
    }
    let Some(removed) = engine.registry.remove(id) else {
        return not_found("source not found");
    };
    engine.stop_tcp_client(id).await;
    Json(json!({ "status": "deleted", "source": removed })).into_response()
}

/// `PATCH /data_sources/{id}`
///
/// Any subset of name/enabled/host/port/sport_overrides. Changing
/// host/port re-keys the source and restarts its worker; 409 when the
/// new endpoint already exists.
pub async fn patch_source(
    State(engine): State<Engine>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let id = id.trim().to_owned();
    if id.is_empty() {
        return bad_request("source id required");
    }

    let port = match body.get("port") {
        None | Some(Value::Null) => None,
        Some(value) => match parse_port(value) {
            Some(port) => Some(port),
            None => return bad_request("invalid port"),
        },
    };
    let host = match body.get("host") {
        None | Some(Value::Null) => None,
        Some(value) => {
            let host = value.as_str().map(str::trim).unwrap_or("");
            if host.is_empty() {
                return bad_request("host cannot be empty");
            }
            Some(host.to_owned())
        }
    };

    let changes = SourcePatch {
        name: body
            .get("name")
            .and_then(Value::as_str)
            .map(|name| name.trim().to_owned()),
        enabled: body.get("enabled").and_then(Value::as_bool),
        host,
        port,
        sport_overrides: body
            .get("sport_overrides")
            .map(|raw| normalize_sport_overrides(Some(raw))),
    };

    let outcome = match engine.registry.patch(&id, &changes) {
        Ok(outcome) => outcome,
        Err(PatchError::NotFound) => return not_found("source not found"),
        Err(PatchError::Conflict) => return conflict("source already exists"),
    };

    if let Some(old_id) = &outcome.replaced_id {
        engine.stop_tcp_client(old_id).await;
        if outcome.entry.enabled {
            engine.start_tcp_client(&outcome.entry).await;
        }
    } else if let Some(enabled) = changes.enabled {
        if enabled {
            engine.start_tcp_client(&outcome.entry).await;
        } else {
            engine.stop_tcp_client(&outcome.entry.id).await;
        }
    }

    Json(json!({ "status": "updated", "source": outcome.entry })).into_response()
}
