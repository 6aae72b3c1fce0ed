use std::net::SocketAddr;

use http::HeaderMap;

const TRUE_CLIENT_IP: &str = "true-client-ip";
const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the client address of a request.
///
/// Checked in order: `True-Client-IP`, `X-Real-IP`, the first entry of
/// `X-Forwarded-For`, then the socket peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_str(headers, TRUE_CLIENT_IP)
        .or_else(|| header_str(headers, X_REAL_IP))
        .or_else(|| {
            header_str(headers, X_FORWARDED_FOR)
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
