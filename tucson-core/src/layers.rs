use std::any::Any;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::response::{IntoResponse, Response};
use axum::Router;
use http::{Request, StatusCode};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, MakeSpan, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{Level, Span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::client_ip::client_ip;
use crate::config::LoggingSettings;
use crate::request_id::{request_id_middleware, RequestId};

/// Install the global tracing subscriber.
///
/// JSON lines by default, human-readable with `pretty`. `RUST_LOG` overrides
/// the level picked from `debug`.
pub fn init_tracing(logging: &LoggingSettings) -> Result<(), TryInitError> {
    let default_level = if logging.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if logging.pretty {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_file(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    }
}

/// Span factory for the access log: one span per request carrying method,
/// path, query, client address, user agent and request id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogSpan;

impl<B> MakeSpan<B> for AccessLogSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let ip = client_ip(request.headers(), peer).unwrap_or_default();
        let user_agent = request
            .headers()
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(RequestId::as_str)
            .unwrap_or("");

        tracing::info_span!(
            "request",
            method = %request.method(),
            path = request.uri().path(),
            query = request.uri().query().unwrap_or(""),
            ip = %ip,
            user_agent = user_agent,
            request_id = request_id,
        )
    }
}

pub type AccessLogLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, AccessLogSpan, (), DefaultOnResponse>;

/// tower-http trace layer logging one line per completed request.
pub fn default_trace() -> AccessLogLayer {
    TraceLayer::new_for_http()
        .make_span_with(AccessLogSpan)
        .on_request(())
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
}

pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Turns handler panics into empty 500 responses.
pub fn catch_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = detail, "Request handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Wrap a router with the shared middleware stack.
///
/// Outermost first: panic boundary, request id, access log.
pub fn apply_default_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(default_trace())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(catch_panic_layer())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn panics_become_500() {
        let app = apply_default_layers(Router::new().route("/boom", get(boom)));
        let resp = app
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn echoes_request_id() {
        let app = apply_default_layers(Router::new().route("/", get(|| async { "ok" })));
        let resp = app
            .oneshot(
                Request::get("/")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.headers()["x-request-id"], "req-42");
    }
}
