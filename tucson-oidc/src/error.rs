use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tucson_security::{SecurityError, TokenError};

/// Errors from provider discovery and the login callback.
///
/// Callback failures answer 401 with an empty body; the detail is logged only.
#[derive(Debug)]
pub enum OidcError {
    /// Required `oidc` settings are missing.
    Config(String),
    /// Discovery document or key set could not be loaded. Fatal at startup.
    Discovery(String),
    /// The provider redirected back with an `error` parameter.
    Provider(String),
    /// The callback carried no `code` parameter.
    MissingCode,
    /// The token endpoint rejected the code or could not be reached.
    Exchange(String),
    /// The token response had no `id_token`.
    MissingIdToken,
    /// The ID token failed verification.
    IdToken(SecurityError),
    /// Identity claims could not be read from the access token.
    Claims(String),
    /// The session token could not be minted.
    Session(TokenError),
}

impl OidcError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OidcError::Config(_) | OidcError::Discovery(_) | OidcError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for OidcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OidcError::Config(msg) => write!(f, "OIDC configuration error: {msg}"),
            OidcError::Discovery(msg) => write!(f, "OIDC discovery failed: {msg}"),
            OidcError::Provider(msg) => write!(f, "Provider returned an error: {msg}"),
            OidcError::MissingCode => write!(f, "Callback is missing the 'code' parameter"),
            OidcError::Exchange(msg) => write!(f, "Code exchange failed: {msg}"),
            OidcError::MissingIdToken => write!(f, "Token response has no id_token"),
            OidcError::IdToken(err) => write!(f, "ID token rejected: {err}"),
            OidcError::Claims(msg) => write!(f, "Cannot read identity claims: {msg}"),
            OidcError::Session(err) => write!(f, "Cannot mint session token: {err}"),
        }
    }
}

impl std::error::Error for OidcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OidcError::IdToken(err) => Some(err),
            OidcError::Session(err) => Some(err),
            _ => None,
        }
    }
}

impl IntoResponse for OidcError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "OIDC callback failed");
        self.status_code().into_response()
    }
}
