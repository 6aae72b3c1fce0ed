//! Health probes.
//!
//! | Path                  | Description          |
//! |-----------------------|----------------------|
//! | `GET /healthz`           | Aggregated status |
//! | `GET /healthz/liveness`  | Liveness probe    |
//! | `GET /healthz/readiness` | Readiness probe   |
//!
//! The gateway keeps no external dependencies it could report on, so every
//! probe answers `{"status":"UP"}`.

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

pub const HEALTH_PATH: &str = "/healthz";
pub const LIVENESS_PATH: &str = "/healthz/liveness";
pub const READINESS_PATH: &str = "/healthz/readiness";

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

pub async fn health() -> HealthResponse {
    HealthResponse {
        status: HealthStatus::Up,
    }
}

/// Routes for all three probes.
pub fn health_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(LIVENESS_PATH, get(health))
        .route(READINESS_PATH, get(health))
}
