use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::ALLOW;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::debug;
use tucson_core::health::health_routes;
use tucson_core::layers::apply_default_layers;
use tucson_core::{client_ip, has_dot_segment, GatewayConfig, RequestId};
use tucson_oidc::{oidc_routes, OidcClient, OidcClientConfig, OidcState};
use tucson_prometheus::{metrics_routes, GatewayMetrics, MetricsConfig, PrometheusLayer};
use tucson_proxy::{ForwardContext, Forwarder};
use tucson_security::{redirect_to_login, AuthDecision, AuthGate, SessionCodec};

use crate::error::GatewayError;

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE";

/// Everything the proxy fallback needs per request. Read-only once built.
struct Dispatch {
    config: Arc<GatewayConfig>,
    gate: AuthGate,
    forwarder: Forwarder,
}

/// A fully assembled gateway, ready to be turned into a router.
pub struct Gateway {
    dispatch: Arc<Dispatch>,
    oidc: Arc<OidcState>,
    metrics: GatewayMetrics,
}

impl Gateway {
    /// Discover the OIDC provider named in `config`, then assemble.
    pub async fn discover(config: GatewayConfig) -> Result<Self, GatewayError> {
        let oidc_config = OidcClientConfig::from_settings(config.oidc())?;
        let client = OidcClient::discover(oidc_config).await?;
        Self::new(config, client)
    }

    /// Assemble from a validated config and an already-discovered provider.
    pub fn new(config: GatewayConfig, client: OidcClient) -> Result<Self, GatewayError> {
        let metrics = GatewayMetrics::new(MetricsConfig::default())
            .map_err(|e| GatewayError::Metrics(e.to_string()))?;
        Self::with_metrics(config, client, metrics)
    }

    pub fn with_metrics(
        config: GatewayConfig,
        client: OidcClient,
        metrics: GatewayMetrics,
    ) -> Result<Self, GatewayError> {
        let codec = Arc::new(SessionCodec::new(config.signing_key())?);
        let forwarder = Forwarder::new(config.registry())?;

        for origin in config.registry().iter() {
            debug!(
                name = %origin.name,
                url = %origin.base_url,
                oidc = origin.requires_auth,
                insecure = origin.insecure_tls,
                "Adding origin"
            );
        }
        for rule in config.matchers().rules() {
            debug!(path = rule.pattern.as_str(), origin = %rule.origin, "Adding matcher");
        }

        Ok(Self {
            dispatch: Arc::new(Dispatch {
                config: Arc::new(config),
                gate: AuthGate::new(codec.clone()),
                forwarder,
            }),
            oidc: Arc::new(OidcState::new(client, codec)),
            metrics,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.dispatch.config
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    /// Reserved routes, then matcher dispatch as the fallback.
    ///
    /// Layers, outermost first: panic boundary, request id, access log, metrics.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .merge(health_routes())
            .merge(metrics_routes(self.metrics.clone()))
            .merge(oidc_routes(self.oidc.clone()))
            .fallback(proxy)
            .with_state(self.dispatch.clone())
            .layer(PrometheusLayer::new(self.metrics.clone()));
        apply_default_layers(router)
    }
}

/// Resolve the origin, enforce the method set and the session gate, forward.
///
/// Dot-segment paths are refused before matching so the rule that matched is
/// the path the backend receives.
async fn proxy(State(dispatch): State<Arc<Dispatch>>, req: Request) -> Response {
    let config = &dispatch.config;
    if has_dot_segment(req.uri().path()) {
        debug!(path = req.uri().path(), "Refusing path with dot segments");
        return StatusCode::BAD_REQUEST.into_response();
    }
    let resolution = config.matchers().resolve(req.uri().path(), config.registry());
    if !resolution.allows(req.method()) {
        debug!(method = %req.method(), path = req.uri().path(), "Method not proxied");
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(ALLOW, HeaderValue::from_static(ALLOWED_METHODS))],
        )
            .into_response();
    }
    let origin = resolution.origin().clone();

    if origin.requires_auth {
        if let AuthDecision::RedirectToLogin(_) = dispatch.gate.authorize(req.headers()) {
            return redirect_to_login();
        }
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ctx = ForwardContext {
        client_ip: client_ip(req.headers(), peer),
        request_id: req.extensions().get::<RequestId>().cloned(),
    };

    match dispatch.forwarder.forward(&origin, req, &ctx).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
