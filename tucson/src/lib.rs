//! Tucson, an authenticating reverse proxy.
//!
//! Requests are matched by path to a named origin and forwarded to it. Origins
//! flagged `oidc` require a session cookie, obtained by logging in through an
//! OpenID Connect provider at `/auth/login`.
//!
//! This crate wires the sub-crates together:
//!
//! | Crate               | Concern                                        |
//! |---------------------|------------------------------------------------|
//! | `tucson-core`       | settings, origins, matchers, shared middleware |
//! | `tucson-security`   | session tokens, auth gate, ID-token checks     |
//! | `tucson-oidc`       | discovery, login redirect, callback            |
//! | `tucson-proxy`      | header rewriting and streamed forwarding       |
//! | `tucson-prometheus` | request metrics and `/metrics`                 |

pub mod cli;
pub mod error;
pub mod gateway;
pub mod server;

pub use tucson_core;
pub use tucson_oidc;
pub use tucson_prometheus;
pub use tucson_proxy;
pub use tucson_security;

pub use error::GatewayError;
pub use gateway::Gateway;
pub use server::{serve, serve_with_shutdown, shutdown_signal, SHUTDOWN_GRACE};
