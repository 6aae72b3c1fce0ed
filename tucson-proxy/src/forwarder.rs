use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use http_body::Body as _;
use tracing::{debug, warn};
use tucson_core::{has_dot_segment, Origin, OriginRegistry, RequestId, X_REQUEST_ID};

use crate::client::{build_client, UpstreamClients};
use crate::error::ProxyError;
use crate::headers::{build_upstream_headers, filter_response_headers, Forwarded};

/// Per-request facts the forwarder cannot read from the request itself.
#[derive(Debug, Clone, Default)]
pub struct ForwardContext {
    pub client_ip: Option<String>,
    pub request_id: Option<RequestId>,
}

/// Relays requests to origins and streams the responses back.
#[derive(Debug, Clone)]
pub struct Forwarder {
    clients: UpstreamClients,
}

impl Forwarder {
    pub fn new(registry: &OriginRegistry) -> Result<Self, ProxyError> {
        Ok(Self {
            clients: UpstreamClients::new(registry)?,
        })
    }

    pub fn clients(&self) -> &UpstreamClients {
        &self.clients
    }

    /// Send `req` to `origin` and relay the answer.
    ///
    /// The upstream URL is `origin.base_url` followed by the request's path and
    /// query, unchanged. Paths with `.`/`..` segments are refused because the
    /// URL parser would resolve them. Transport failures become
    /// [`ProxyError::Unavailable`].
    pub async fn forward(
        &self,
        origin: &Origin,
        req: Request,
        ctx: &ForwardContext,
    ) -> Result<Response, ProxyError> {
        let (parts, body) = req.into_parts();
        let request_id = ctx.request_id.as_ref().map(RequestId::as_str).unwrap_or("");

        if has_dot_segment(parts.uri.path()) {
            return Err(ProxyError::InvalidPath(parts.uri.path().to_string()));
        }

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let backend_url = format!("{}{}", origin.base_url, path_and_query);
        let url = reqwest::Url::parse(&backend_url).map_err(|e| {
            ProxyError::InvalidRequest(format!("backend url '{backend_url}': {e}"))
        })?;

        let forwarded = Forwarded {
            client_ip: ctx.client_ip.clone(),
            proto: parts.uri.scheme_str().unwrap_or("http").to_string(),
        };
        let mut headers = build_upstream_headers(&parts.headers, origin, &forwarded)?;
        if let Some(id) = &ctx.request_id {
            if !headers.contains_key(&X_REQUEST_ID) {
                if let Ok(value) = id.as_str().parse() {
                    headers.insert(X_REQUEST_ID.clone(), value);
                }
            }
        }

        debug!(
            origin = %origin.name,
            backend.url = %url,
            request.id = %request_id,
            "Proxying request"
        );

        let client = match self.clients.get(&origin.name) {
            Some(client) => client.clone(),
            None => build_client(origin)?,
        };
        let mut outbound = client.request(parts.method, url).headers(headers);
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream = outbound.send().await.map_err(|e| {
            warn!(
                origin = %origin.name,
                backend.url = %backend_url,
                request.id = %request_id,
                error = %e,
                "Failed to proxy request to backend"
            );
            ProxyError::Unavailable(e.to_string())
        })?;

        let status = upstream.status();
        debug!(request.id = %request_id, code = status.as_u16(), "Returning response code");

        let headers = filter_response_headers(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
