//! Session token codec.
//!
//! Tokens are compact JWS strings signed with HMAC-SHA256:
//! `base64url(header) "." base64url(payload) "." base64url(signature)`.
//! The header is always `{"alg":"HS256","typ":"JWT"}` and payload keys are
//! serialized in sorted order, so the same claims and secret always produce
//! the same token.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{crypto, Algorithm, DecodingKey, EncodingKey};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SecurityError, TokenError};

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claim names private claims may not reuse.
const REGISTERED_CLAIMS: [&str; 7] = ["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    /// Empty subjects are omitted from the payload.
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
    pub private: Map<String, Value>,
}

impl SessionClaims {
    pub fn new(subject: impl Into<String>, not_before: DateTime<Utc>, expiry: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            not_before: truncate(not_before),
            expiry: truncate(expiry),
            private: Map::new(),
        }
    }

    /// Attach private claims. `claims` must serialize to a JSON object.
    pub fn with_private_claims<T: Serialize>(mut self, claims: &T) -> Result<Self, TokenError> {
        let value =
            serde_json::to_value(claims).map_err(|e| TokenError::Serialization(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(TokenError::InvalidClaims(
                "private claims must be a JSON object".to_string(),
            ));
        };
        if let Some(name) = map.keys().find(|k| REGISTERED_CLAIMS.contains(&k.as_str())) {
            return Err(TokenError::InvalidClaims(format!(
                "'{name}' is a registered claim"
            )));
        }
        self.private.extend(map);
        Ok(self)
    }

    pub fn private_claim(&self, name: &str) -> Option<&Value> {
        self.private.get(name)
    }

    /// `not_before <= now < expiry`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.check_time(now).is_ok()
    }

    fn check_time(&self, now: DateTime<Utc>) -> Result<(), SecurityError> {
        let now = now.timestamp();
        if now < self.not_before.timestamp() {
            return Err(SecurityError::TokenNotYetValid);
        }
        if now >= self.expiry.timestamp() {
            return Err(SecurityError::TokenExpired);
        }
        Ok(())
    }

    fn to_payload(&self) -> Result<Vec<u8>, TokenError> {
        let mut payload: BTreeMap<&str, Value> = self
            .private
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        payload.insert("exp", Value::from(self.expiry.timestamp()));
        payload.insert("nbf", Value::from(self.not_before.timestamp()));
        if !self.subject.is_empty() {
            payload.insert("sub", Value::from(self.subject.as_str()));
        }
        serde_json::to_vec(&payload).map_err(|e| TokenError::Serialization(e.to_string()))
    }

    fn from_payload(mut payload: Map<String, Value>) -> Result<Self, SecurityError> {
        let exp = take_timestamp(&mut payload, "exp")?;
        let nbf = take_timestamp(&mut payload, "nbf")?;
        let subject = match payload.remove("sub") {
            Some(Value::String(s)) => s,
            None => String::new(),
            Some(_) => return Err(SecurityError::InvalidToken("'sub' is not a string".into())),
        };
        Ok(Self {
            subject,
            not_before: nbf,
            expiry: exp,
            private: payload,
        })
    }
}

fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}

fn take_timestamp(
    payload: &mut Map<String, Value>,
    name: &str,
) -> Result<DateTime<Utc>, SecurityError> {
    payload
        .remove(name)
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| SecurityError::InvalidToken(format!("missing or invalid '{name}' claim")))
}

/// Mints and verifies session tokens with one shared secret.
#[derive(Clone)]
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Sign `claims` into a compact token.
    pub fn mint(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        let header = URL_SAFE_NO_PAD.encode(HEADER);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_payload()?);
        let signing_input = format!("{header}.{payload}");

        let signature = crypto::sign(signing_input.as_bytes(), &self.encoding_key, Algorithm::HS256)
            .map_err(|e| TokenError::Serialization(format!("signing failed: {e}")))?;

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Verify signature and time bounds against the current time.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SecurityError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SecurityError> {
        let malformed = || SecurityError::InvalidToken("expected three dot-separated segments".into());
        let (signing_input, signature) = token.rsplit_once('.').ok_or_else(malformed)?;
        let (header, payload) = signing_input.split_once('.').ok_or_else(malformed)?;
        if payload.contains('.') {
            return Err(malformed());
        }

        let header: Value = decode_json(header, "header")?;
        if header.get("alg").and_then(Value::as_str) != Some("HS256") {
            return Err(SecurityError::InvalidToken("unexpected signing algorithm".into()));
        }

        let verified = crypto::verify(
            signature,
            signing_input.as_bytes(),
            &self.decoding_key,
            Algorithm::HS256,
        )
        .map_err(|_| SecurityError::InvalidToken("signature is not base64url".into()))?;
        if !verified {
            return Err(SecurityError::InvalidToken("signature mismatch".into()));
        }

        let payload: Map<String, Value> = decode_json(payload, "payload")?;
        let claims = SessionClaims::from_payload(payload)?;
        claims.check_time(now)?;

        debug!(sub = %claims.subject, "Session token verified");
        Ok(claims)
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, SecurityError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| SecurityError::InvalidToken(format!("{what} is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SecurityError::InvalidToken(format!("{what} is not valid JSON: {e}")))
}
