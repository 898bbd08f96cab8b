use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// JSON error body used across the API: `{"error": "<message>"}`.
pub(crate) fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub(crate) fn bad_request(message: impl Into<String>) -> Response {
    json_error(StatusCode::BAD_REQUEST, message)
}

pub(crate) fn not_found(message: impl Into<String>) -> Response {
    json_error(StatusCode::NOT_FOUND, message)
}

pub(crate) fn conflict(message: impl Into<String>) -> Response {
    json_error(StatusCode::CONFLICT, message)
}

/// 404 used by the sport-scoped feed endpoints, whose contract is an
/// empty JSON body rather than an error envelope.
pub(crate) fn empty_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_error_shape() {
        let response = bad_request("host and port required");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let parsed: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(parsed["error"], "host and port required");
    }
}
