use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use tracing::{debug, warn};

use crate::config::IdTokenConfig;
use crate::error::SecurityError;
use crate::jwks::JwksCache;

/// Source of verification keys: the provider's JWKS, or a fixed key in tests.
enum KeySource {
    Jwks(Arc<JwksCache>),
    Static(DecodingKey),
}

/// Verifies ID tokens returned by the provider's token endpoint.
///
/// Checks performed:
/// 1. the header algorithm is allowed and names a known `kid`
/// 2. the signature is valid for that key
/// 3. `iss` equals the configured issuer, `aud` contains the client ID and
///    `exp` has not passed
pub struct IdTokenVerifier {
    keys: KeySource,
    config: IdTokenConfig,
}

impl IdTokenVerifier {
    pub fn new(jwks: Arc<JwksCache>, config: IdTokenConfig) -> Self {
        Self {
            keys: KeySource::Jwks(jwks),
            config,
        }
    }

    pub fn new_with_static_key(key: DecodingKey, config: IdTokenConfig) -> Self {
        Self {
            keys: KeySource::Static(key),
            config,
        }
    }

    pub fn config(&self) -> &IdTokenConfig {
        &self.config
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<serde_json::Value, SecurityError> {
        let header = decode_header(token)
            .map_err(|e| SecurityError::InvalidToken(format!("Failed to decode header: {e}")))?;
        let algorithm = header.alg;
        debug!(?algorithm, kid = ?header.kid, "Decoded ID token header");

        if !self.config.allowed_algorithms.contains(&algorithm) {
            return Err(SecurityError::ValidationFailed(format!(
                "Disallowed algorithm: {algorithm:?}"
            )));
        }

        let key = match &self.keys {
            KeySource::Static(key) => key.clone(),
            KeySource::Jwks(jwks) => {
                let kid = header.kid.as_deref().ok_or_else(|| {
                    SecurityError::InvalidToken("ID token header missing 'kid'".into())
                })?;
                jwks.get_key(kid).await?
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.algorithms = self.config.allowed_algorithms.clone();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.client_id]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;

        let data = decode::<serde_json::Value>(token, &key, &validation).map_err(|e| {
            let err = match e.kind() {
                ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                ErrorKind::ImmatureSignature => SecurityError::TokenNotYetValid,
                ErrorKind::InvalidIssuer => SecurityError::ValidationFailed("Invalid issuer".into()),
                ErrorKind::InvalidAudience => {
                    SecurityError::ValidationFailed("Invalid audience".into())
                }
                _ => SecurityError::InvalidToken(e.to_string()),
            };
            warn!(error = %err, "ID token verification failed");
            err
        })?;

        debug!(
            sub = data.claims.get("sub").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "ID token verified"
        );
        Ok(data.claims)
    }
}
