//! Reverse-proxy forwarding for the Tucson gateway.
//!
//! [`Forwarder::forward`] rewrites headers for the chosen [`Origin`](tucson_core::Origin),
//! sends the request with that origin's client and streams the backend
//! response back with sensitive headers removed.

pub mod client;
pub mod error;
pub mod forwarder;
pub mod headers;

pub use client::{build_client, UpstreamClients, UPSTREAM_TIMEOUT};
pub use error::{ProxyError, UNAVAILABLE_BODY};
pub use forwarder::{ForwardContext, Forwarder};
pub use headers::{
    basic_authorization, build_upstream_headers, filter_response_headers, is_hop_by_hop_header,
    Forwarded,
};
