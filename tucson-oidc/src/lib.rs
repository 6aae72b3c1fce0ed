//! OpenID Connect login for the Tucson gateway.
//!
//! The gateway acts as a confidential relying party: `/auth/login` sends the
//! browser to the provider, `/auth/callback` redeems the code, verifies the ID
//! token and trades the identity for a short-lived session cookie.
//!
//! ```ignore
//! let client = OidcClient::discover(OidcClientConfig::from_settings(config.oidc())?).await?;
//! let router = oidc_routes(Arc::new(OidcState::new(client, codec)));
//! ```

pub mod claims;
pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
mod handlers;
pub mod state;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

pub use claims::IdentityClaims;
pub use client::{OidcClient, TokenResponse};
pub use config::OidcClientConfig;
pub use discovery::{discover, ProviderMetadata};
pub use error::OidcError;
pub use handlers::CallbackParams;
pub use state::{OidcState, LOGIN_STATE};

/// Path of the provider's redirect back to the gateway.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// `/auth/login` and `/auth/callback`, ready to merge into the gateway router.
pub fn oidc_routes<S>(state: Arc<OidcState>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(tucson_security::LOGIN_PATH, get(handlers::login))
        .route(CALLBACK_PATH, get(handlers::callback))
        .with_state(state)
}
