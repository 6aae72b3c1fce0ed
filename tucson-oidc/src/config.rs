use std::time::Duration;

use tucson_core::config::OidcSettings;

use crate::error::OidcError;

const OPENID_SCOPE: &str = "openid";

/// Relying-party settings for the authorization-code flow.
#[derive(Debug, Clone)]
pub struct OidcClientConfig {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    /// Requested scopes. Always contains `openid`.
    pub scopes: Vec<String>,
    /// Validity window of minted session tokens (default: 5 minutes).
    pub session_ttl: Duration,
    /// Client-side lifetime of the session cookie (default: 60 minutes).
    pub cookie_ttl: Duration,
    /// Timeout for discovery, JWKS and token endpoint calls (default: 30s).
    pub http_timeout: Duration,
}

impl OidcClientConfig {
    pub fn new(
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            scopes: vec![OPENID_SCOPE.to_string()],
            session_ttl: Duration::from_secs(5 * 60),
            cookie_ttl: Duration::from_secs(60 * 60),
            http_timeout: Duration::from_secs(30),
        }
    }

    /// Build from the `oidc` settings section.
    pub fn from_settings(settings: &OidcSettings) -> Result<Self, OidcError> {
        if settings.issuer.is_empty() {
            return Err(OidcError::Config("oidc.issuer is not configured".into()));
        }
        if settings.client_id.is_empty() {
            return Err(OidcError::Config("oidc.client-id is not configured".into()));
        }
        Ok(Self::new(
            &settings.issuer,
            &settings.client_id,
            &settings.client_secret,
            &settings.redirect_url,
        )
        .with_scopes(settings.scopes.iter().cloned()))
    }

    /// Replace the requested scopes. `openid` is kept first whether listed or not.
    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = String>) -> Self {
        let mut all = vec![OPENID_SCOPE.to_string()];
        for scope in scopes {
            if !scope.is_empty() && !all.contains(&scope) {
                all.push(scope);
            }
        }
        self.scopes = all;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_cookie_ttl(mut self, ttl: Duration) -> Self {
        self.cookie_ttl = ttl;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
