//! Health check endpoint.

use axum::http::StatusCode;

/// Liveness probe. Returns 200 whenever the server is accepting requests.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
