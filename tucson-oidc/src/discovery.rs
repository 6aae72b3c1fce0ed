use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::OidcError;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// The subset of the provider's discovery document the gateway uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

impl ProviderMetadata {
    pub(crate) fn authorization_url(&self) -> Result<Url, OidcError> {
        Url::parse(&self.authorization_endpoint).map_err(|e| {
            OidcError::Discovery(format!(
                "invalid authorization_endpoint '{}': {e}",
                self.authorization_endpoint
            ))
        })
    }
}

/// Fetch `{issuer}/.well-known/openid-configuration`.
///
/// The document's `issuer` must equal the configured issuer exactly.
pub async fn discover(client: &reqwest::Client, issuer: &str) -> Result<ProviderMetadata, OidcError> {
    let url = format!("{}{DISCOVERY_PATH}", issuer.trim_end_matches('/'));
    debug!(url = %url, "Fetching OIDC discovery document");

    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| OidcError::Discovery(format!("failed to fetch {url}: {e}")))?;
    if !resp.status().is_success() {
        return Err(OidcError::Discovery(format!(
            "{url} returned HTTP {}",
            resp.status()
        )));
    }
    let metadata: ProviderMetadata = resp
        .json()
        .await
        .map_err(|e| OidcError::Discovery(format!("invalid discovery document: {e}")))?;

    if metadata.issuer != issuer {
        return Err(OidcError::Discovery(format!(
            "issuer did not match: expected '{issuer}', got '{}'",
            metadata.issuer
        )));
    }
    metadata.authorization_url()?;
    Ok(metadata)
}
