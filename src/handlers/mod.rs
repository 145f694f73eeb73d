// handlers/mod.rs - one module per resource kind, plus the liveness probe

pub mod credentials;
pub mod exporters;

use axum::http::StatusCode;

/// GET /health - process liveness only, no store round-trip
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok\n")
}
