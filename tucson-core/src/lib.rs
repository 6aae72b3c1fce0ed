//! Shared building blocks for the Tucson gateway.
//!
//! - [`config`]: YAML + environment settings and the validated [`GatewayConfig`].
//! - [`origin`] and [`matcher`]: where each request path is forwarded.
//! - [`request_id`], [`client_ip`], [`layers`]: per-request context and the
//!   middleware stack every route runs behind.
//! - [`health`]: liveness and readiness probes.

pub mod client_ip;
pub mod config;
pub mod health;
pub mod layers;
pub mod matcher;
pub mod origin;
pub mod request_id;

pub use client_ip::client_ip;
pub use config::{ConfigError, GatewayConfig, Settings};
pub use matcher::{has_dot_segment, Matcher, MatcherTable, PathPattern, Resolution, PROXIED_METHODS};
pub use origin::{BasicAuth, Origin, OriginRegistry};
pub use request_id::{RequestId, X_REQUEST_ID};
