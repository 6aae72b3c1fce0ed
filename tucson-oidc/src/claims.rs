use std::collections::HashSet;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::OidcError;

/// Identity claims read from the provider's access token.
///
/// Missing claims default to empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unique_name: String,
}

impl IdentityClaims {
    /// Read the payload of a compact JWS without checking its signature.
    ///
    /// The header must still parse and name a known algorithm. Only call this
    /// on a token obtained directly from the token endpoint.
    pub fn decode_unverified(token: &str) -> Result<Self, OidcError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.insecure_disable_signature_validation();
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        decode::<IdentityClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|e| OidcError::Claims(format!("access token is not a readable JWS: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    fn token_with(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn reads_identity() {
        let token = token_with(
            r#"{"email":"jane@example.com","name":"Jane Doe","unique_name":"EXAMPLE\\jane","exp":1}"#,
        );
        let claims = IdentityClaims::decode_unverified(&token).unwrap();
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.name, "Jane Doe");
        assert_eq!(claims.unique_name, "EXAMPLE\\jane");
    }

    #[test]
    fn missing_claims_are_empty() {
        let claims = IdentityClaims::decode_unverified(&token_with(r#"{"sub":"x"}"#)).unwrap();
        assert_eq!(claims, IdentityClaims::default());
    }

    #[test]
    fn opaque_token_is_rejected() {
        for token in ["not-a-jwt", "a.b", "a.b.c.d"] {
            assert!(matches!(
                IdentityClaims::decode_unverified(token),
                Err(OidcError::Claims(_))
            ));
        }
    }

    #[test]
    fn unsigned_header_is_rejected() {
        let token = format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(r#"{"email":"jane@example.com"}"#)
        );
        assert!(matches!(
            IdentityClaims::decode_unverified(&token),
            Err(OidcError::Claims(_))
        ));
    }

    #[test]
    fn expired_token_is_still_read() {
        let token = token_with(r#"{"email":"jane@example.com","exp":1,"nbf":1,"aud":"x"}"#);
        assert_eq!(
            IdentityClaims::decode_unverified(&token).unwrap().email,
            "jane@example.com"
        );
    }

    #[test]
    fn non_json_payload_is_rejected() {
        assert!(IdentityClaims::decode_unverified(&token_with("hello")).is_err());
    }
}
