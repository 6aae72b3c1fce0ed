use tucson_core::ConfigError;
use tucson_oidc::OidcError;
use tucson_proxy::ProxyError;
use tucson_security::TokenError;

/// Startup and serving failures. Every variant aborts the process.
#[derive(Debug)]
pub enum GatewayError {
    Config(ConfigError),
    Oidc(OidcError),
    SigningKey(TokenError),
    Proxy(ProxyError),
    Metrics(String),
    Io(std::io::Error),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Config(err) => write!(f, "Configuration error: {err}"),
            GatewayError::Oidc(err) => write!(f, "OIDC setup failed: {err}"),
            GatewayError::SigningKey(err) => write!(f, "Invalid signing key: {err}"),
            GatewayError::Proxy(err) => write!(f, "Proxy setup failed: {err}"),
            GatewayError::Metrics(msg) => write!(f, "Metrics setup failed: {msg}"),
            GatewayError::Io(err) => write!(f, "Server error: {err}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Config(err) => Some(err),
            GatewayError::Oidc(err) => Some(err),
            GatewayError::SigningKey(err) => Some(err),
            GatewayError::Proxy(err) => Some(err),
            GatewayError::Metrics(_) => None,
            GatewayError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        GatewayError::Config(err)
    }
}

impl From<OidcError> for GatewayError {
    fn from(err: OidcError) -> Self {
        GatewayError::Oidc(err)
    }
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        GatewayError::SigningKey(err)
    }
}

impl From<ProxyError> for GatewayError {
    fn from(err: ProxyError) -> Self {
        GatewayError::Proxy(err)
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err)
    }
}
