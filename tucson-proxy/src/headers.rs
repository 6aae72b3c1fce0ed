//! Header rewriting between the client and the backend.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tucson_core::{BasicAuth, Origin};

use crate::error::ProxyError;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Hop-by-hop headers that must never be forwarded
static HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Backend headers never relayed to the client.
static SANITIZED_RESPONSE_HEADERS: [HeaderName; 2] = [header::WWW_AUTHENTICATE, header::SERVER];

/// What the forwarder knows about the original client.
#[derive(Debug, Clone, Default)]
pub struct Forwarded {
    pub client_ip: Option<String>,
    pub proto: String,
}

pub fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}

/// Header names listed in `Connection` are hop-by-hop for this message too.
fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

/// Headers for the outbound request.
///
/// Order: inbound headers (minus hop-by-hop and `Host`), then the origin's
/// `set_headers` (replace), `add_headers` (append), Basic credentials and
/// finally `X-Forwarded-For` / `X-Forwarded-Proto`.
pub fn build_upstream_headers(
    inbound: &HeaderMap,
    origin: &Origin,
    forwarded: &Forwarded,
) -> Result<HeaderMap, ProxyError> {
    let listed = connection_listed(inbound);
    let mut headers = HeaderMap::with_capacity(inbound.len() + 4);

    for (name, value) in inbound {
        if *name == header::HOST || is_hop_by_hop_header(name) || listed.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    for (name, value) in &origin.set_headers {
        headers.insert(name.clone(), value.clone());
    }
    for (name, value) in &origin.add_headers {
        headers.append(name.clone(), value.clone());
    }

    if let Some(credentials) = &origin.basic_auth {
        headers.insert(header::AUTHORIZATION, basic_authorization(credentials)?);
    }

    if let Some(ip) = &forwarded.client_ip {
        let value = HeaderValue::from_str(ip)
            .map_err(|e| ProxyError::InvalidRequest(format!("client ip '{ip}': {e}")))?;
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
    let proto = HeaderValue::from_str(&forwarded.proto)
        .map_err(|e| ProxyError::InvalidRequest(format!("scheme '{}': {e}", forwarded.proto)))?;
    headers.insert(X_FORWARDED_PROTO.clone(), proto);

    Ok(headers)
}

/// `Basic base64(username:password)`
pub fn basic_authorization(credentials: &BasicAuth) -> Result<HeaderValue, ProxyError> {
    let encoded = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Backend response headers as relayed to the client.
///
/// Multi-valued headers keep every value; `WWW-Authenticate`, `Server` and
/// hop-by-hop headers are dropped.
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(upstream);
    let mut filtered = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if SANITIZED_RESPONSE_HEADERS.contains(name)
            || is_hop_by_hop_header(name)
            || listed.contains(name)
        {
            tracing::trace!(header = %name, "Dropping backend response header");
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}
