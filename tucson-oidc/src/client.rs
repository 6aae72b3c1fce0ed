use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};
use tucson_security::{IdTokenConfig, IdTokenVerifier, JwksCache};
use url::Url;

use crate::config::OidcClientConfig;
use crate::discovery::{discover, ProviderMetadata};
use crate::error::OidcError;

/// Successful token endpoint response (RFC 6749 §5.1 plus `id_token`).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub id_token: Option<String>,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
}

/// A relying party bound to one discovered provider.
pub struct OidcClient {
    config: OidcClientConfig,
    metadata: ProviderMetadata,
    authorization_url: Url,
    http: reqwest::Client,
    verifier: IdTokenVerifier,
}

impl OidcClient {
    /// Discover the provider and load its signing keys.
    ///
    /// Any failure here is fatal: the gateway cannot serve logins without them.
    pub async fn discover(config: OidcClientConfig) -> Result<Self, OidcError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| OidcError::Discovery(format!("failed to build HTTP client: {e}")))?;

        let metadata = discover(&http, &config.issuer).await?;
        let id_config = IdTokenConfig::new(&metadata.jwks_uri, &metadata.issuer, &config.client_id);
        let jwks = JwksCache::new(&id_config, http.clone())
            .await
            .map_err(|e| OidcError::Discovery(e.to_string()))?;
        info!(
            issuer = %metadata.issuer,
            client_id = %config.client_id,
            "OIDC provider discovered"
        );

        let verifier = IdTokenVerifier::new(Arc::new(jwks), id_config);
        Self::from_parts(config, metadata, http, verifier)
    }

    /// Assemble a client from already-resolved parts.
    pub fn from_parts(
        config: OidcClientConfig,
        metadata: ProviderMetadata,
        http: reqwest::Client,
        verifier: IdTokenVerifier,
    ) -> Result<Self, OidcError> {
        let authorization_url = metadata.authorization_url()?;
        Ok(Self {
            config,
            metadata,
            authorization_url,
            http,
            verifier,
        })
    }

    pub fn config(&self) -> &OidcClientConfig {
        &self.config
    }

    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// The provider URL the browser is sent to for login.
    pub fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.authorization_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);
        url
    }

    /// Redeem an authorization code at the token endpoint.
    ///
    /// The client authenticates with HTTP Basic credentials.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError> {
        debug!(endpoint = %self.metadata.token_endpoint, "Exchanging authorization code");
        let resp = self
            .http
            .post(&self.metadata.token_endpoint)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OidcError::Exchange(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OidcError::Exchange(format!(
                "token endpoint returned HTTP {status}"
            )));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| OidcError::Exchange(format!("invalid token response: {e}")))?;
        if token.access_token.is_empty() {
            return Err(OidcError::Exchange(
                "token response is missing access_token".into(),
            ));
        }
        Ok(token)
    }

    /// Verify an ID token's signature, issuer, audience and expiry.
    pub async fn verify_id_token(&self, token: &str) -> Result<serde_json::Value, OidcError> {
        self.verifier.verify(token).await.map_err(OidcError::IdToken)
    }
}
