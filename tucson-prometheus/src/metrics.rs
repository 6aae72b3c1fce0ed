use std::sync::Arc;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Metric namespace of every series the gateway exports.
pub const DEFAULT_PREFIX: &str = "tucson";

/// Settings for [`GatewayMetrics`].
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Namespace prepended to every metric name.
    pub prefix: String,
    /// Request paths starting with any of these are not tracked.
    pub exclude_paths: Vec<String>,
    /// Histogram buckets for request durations, in seconds.
    pub buckets: Vec<f64>,
    /// Register the process collector (Linux only).
    pub process_metrics: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            exclude_paths: vec!["/metrics".to_string(), "/healthz".to_string()],
            buckets: prometheus::DEFAULT_BUCKETS.to_vec(),
            process_metrics: true,
        }
    }
}

struct Inner {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    in_flight: IntGauge,
    config: MetricsConfig,
}

/// Request metrics on a registry owned by one gateway instance.
#[derive(Clone)]
pub struct GatewayMetrics {
    inner: Arc<Inner>,
}

impl GatewayMetrics {
    pub fn new(config: MetricsConfig) -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some(config.prefix.clone()), None)?;

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(config.buckets.clone()),
            &["method", "path", "status"],
        )?;
        let in_flight = IntGauge::new(
            "http_requests_in_flight",
            "Number of HTTP requests currently being served",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        #[cfg(all(feature = "process", target_os = "linux"))]
        if config.process_metrics {
            registry.register(Box::new(
                prometheus::process_collector::ProcessCollector::for_self(),
            ))?;
        }

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                requests_total,
                request_duration,
                in_flight,
                config,
            }),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.inner.config
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.inner
            .config
            .exclude_paths
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }

    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        self.inner.requests_total.with_label_values(&labels).inc();
        self.inner
            .request_duration
            .with_label_values(&labels)
            .observe(duration_secs);
    }

    pub fn inc_in_flight(&self) {
        self.inner.in_flight.inc();
    }

    pub fn dec_in_flight(&self) {
        self.inner.in_flight.dec();
    }

    pub fn in_flight(&self) -> i64 {
        self.inner.in_flight.get()
    }

    /// All registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl std::fmt::Debug for GatewayMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMetrics")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
