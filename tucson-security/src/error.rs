/// Errors raised while verifying session tokens or provider ID tokens.
#[derive(Debug)]
pub enum SecurityError {
    /// The request carries no `jwt` session cookie.
    MissingSessionCookie,

    /// The token is malformed, has a bad signature or an unexpected algorithm.
    InvalidToken(String),

    /// The token's expiry has passed.
    TokenExpired,

    /// The token's not-before time is still in the future.
    TokenNotYetValid,

    /// The key ID (kid) from the token header is not found in the JWKS.
    UnknownKeyId(String),

    /// Failed to fetch the JWKS from the provider.
    JwksFetchError(String),

    /// Claim validation failed (issuer, audience or other mismatch).
    ValidationFailed(String),
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::MissingSessionCookie => write!(f, "Missing session cookie"),
            SecurityError::InvalidToken(msg) => write!(f, "Invalid token: {msg}"),
            SecurityError::TokenExpired => write!(f, "Token expired"),
            SecurityError::TokenNotYetValid => write!(f, "Token not yet valid"),
            SecurityError::UnknownKeyId(kid) => write!(f, "Unknown signing key: {kid}"),
            SecurityError::JwksFetchError(msg) => write!(f, "JWKS fetch error: {msg}"),
            SecurityError::ValidationFailed(msg) => write!(f, "Token validation failed: {msg}"),
        }
    }
}

impl std::error::Error for SecurityError {}

/// Errors raised while minting session tokens.
#[derive(Debug)]
pub enum TokenError {
    /// The signing secret is empty.
    EmptySecret,

    /// Private claims are not a JSON object, or reuse a registered claim name.
    InvalidClaims(String),

    /// The claims could not be serialized.
    Serialization(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::EmptySecret => write!(f, "Signing secret is empty"),
            TokenError::InvalidClaims(msg) => write!(f, "Invalid private claims: {msg}"),
            TokenError::Serialization(msg) => write!(f, "Failed to serialize claims: {msg}"),
        }
    }
}

impl std::error::Error for TokenError {}
