use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::metrics::GatewayMetrics;

/// Tower layer that tracks HTTP request metrics.
#[derive(Clone)]
pub struct PrometheusLayer {
    metrics: GatewayMetrics,
}

impl PrometheusLayer {
    pub fn new(metrics: GatewayMetrics) -> Self {
        Self { metrics }
    }
}

impl<S> Layer<S> for PrometheusLayer {
    type Service = PrometheusService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PrometheusService {
            inner,
            metrics: self.metrics.clone(),
        }
    }
}

/// Tower service that wraps requests with metrics tracking.
#[derive(Clone)]
pub struct PrometheusService<S> {
    inner: S,
    metrics: GatewayMetrics,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PrometheusService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = PrometheusResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let tracking = if self.metrics.is_excluded(&path) {
            None
        } else {
            Some(InFlight::enter(self.metrics.clone()))
        };

        PrometheusResponseFuture {
            inner: self.inner.call(req),
            method,
            path,
            start: Instant::now(),
            tracking,
        }
    }
}

/// Holds one slot of the in-flight gauge; released on drop so cancelled
/// requests do not leak.
struct InFlight {
    metrics: GatewayMetrics,
}

impl InFlight {
    fn enter(metrics: GatewayMetrics) -> Self {
        metrics.inc_in_flight();
        Self { metrics }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.metrics.dec_in_flight();
    }
}

pin_project! {
    /// Future that records metrics when the response completes.
    pub struct PrometheusResponseFuture<F> {
        #[pin]
        inner: F,
        method: String,
        path: String,
        start: Instant,
        tracking: Option<InFlight>,
    }
}

impl<F, ResBody, E> Future for PrometheusResponseFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Ready(result) => {
                if let Some(in_flight) = this.tracking.take() {
                    let duration = this.start.elapsed().as_secs_f64();
                    let status = match &result {
                        Ok(response) => response.status().as_u16(),
                        Err(_) => 500,
                    };

                    // Normalize path to avoid cardinality explosion
                    let normalized_path = normalize_path(this.path);
                    in_flight
                        .metrics
                        .record_request(this.method, &normalized_path, status, duration);
                }

                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Replaces numeric and UUID path segments with `{id}`.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() || is_uuid(segment) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
        && s.matches('-').count() == 4
}
