use std::sync::Arc;

use tucson_security::SessionCodec;

use crate::client::OidcClient;

/// Value sent as the OAuth `state` parameter on every login.
///
/// It is constant and never checked on the callback, so the flow carries no
/// CSRF binding to the browser session.
pub const LOGIN_STATE: &str = "foobar";

/// Shared state behind the `/auth/*` routes.
pub struct OidcState {
    pub client: OidcClient,
    pub codec: Arc<SessionCodec>,
}

impl OidcState {
    pub fn new(client: OidcClient, codec: Arc<SessionCodec>) -> Self {
        Self { client, codec }
    }
}
