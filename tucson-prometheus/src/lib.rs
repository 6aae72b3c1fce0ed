//! Prometheus metrics for the Tucson gateway.
//!
//! [`GatewayMetrics`] owns its registry, so two gateways in one process (as in
//! tests) never share series. [`PrometheusLayer`] records every request and
//! [`metrics_routes`] exposes the text format on `/metrics`.

pub mod handler;
pub mod layer;
pub mod metrics;

use axum::routing::get;
use axum::Router;

pub use handler::metrics_handler;
pub use layer::{normalize_path, PrometheusLayer, PrometheusService};
pub use metrics::{GatewayMetrics, MetricsConfig, DEFAULT_PREFIX};

pub const METRICS_PATH: &str = "/metrics";

/// `GET /metrics` for `metrics`.
pub fn metrics_routes<S>(metrics: GatewayMetrics) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(metrics)
}
