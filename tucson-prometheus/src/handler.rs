use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::metrics::GatewayMetrics;

pub const CONTENT_TYPE_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the /metrics endpoint.
/// Returns metrics in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<GatewayMetrics>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(CONTENT_TYPE, CONTENT_TYPE_TEXT)], body).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
