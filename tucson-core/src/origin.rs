use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::{HeaderName, HeaderValue};

use crate::config::{ConfigError, OriginSettings};

/// Credentials injected as `Authorization: Basic ...` on proxied requests.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A named upstream service the gateway can forward requests to.
#[derive(Debug, Clone)]
pub struct Origin {
    pub name: String,
    /// Scheme and authority (and optional path prefix) the inbound request
    /// URI is appended to, verbatim.
    pub base_url: String,
    /// Headers that replace any inbound value with the same name.
    pub set_headers: Vec<(HeaderName, HeaderValue)>,
    /// Headers appended alongside inbound values.
    pub add_headers: Vec<(HeaderName, HeaderValue)>,
    /// Skip upstream TLS certificate verification.
    pub insecure_tls: bool,
    /// Require a valid session token before forwarding.
    pub requires_auth: bool,
    pub basic_auth: Option<BasicAuth>,
}

impl Origin {
    /// Validate one `origins` entry.
    pub fn from_settings(name: &str, settings: &OriginSettings) -> Result<Self, ConfigError> {
        let base_url = settings.url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidOrigin {
                name: name.to_string(),
                reason: "url is empty".to_string(),
            });
        }
        let parsed = url::Url::parse(base_url).map_err(|e| ConfigError::InvalidOrigin {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidOrigin {
                name: name.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            set_headers: header_pairs(name, &settings.set_headers)?,
            add_headers: header_pairs(name, &settings.add_headers)?,
            insecure_tls: settings.insecure,
            requires_auth: settings.oidc,
            basic_auth: settings.basicauth.as_ref().map(|b| BasicAuth {
                username: b.username.clone(),
                password: b.password.clone(),
            }),
        })
    }
}

fn header_pairs<'a>(
    origin: &str,
    headers: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Result<Vec<(HeaderName, HeaderValue)>, ConfigError> {
    headers
        .into_iter()
        .map(|(name, value)| {
            let invalid = || ConfigError::InvalidHeader {
                origin: origin.to_string(),
                header: name.clone(),
            };
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            Ok((name, value))
        })
        .collect()
}

/// All declared origins, keyed by name, plus the resolved default.
#[derive(Debug, Clone)]
pub struct OriginRegistry {
    origins: HashMap<String, Arc<Origin>>,
    default: Arc<Origin>,
}

impl OriginRegistry {
    /// Build the registry. Fails when `default_name` is not among `origins`.
    pub fn new(
        origins: impl IntoIterator<Item = Origin>,
        default_name: &str,
    ) -> Result<Self, ConfigError> {
        let origins: HashMap<String, Arc<Origin>> = origins
            .into_iter()
            .map(|o| (o.name.clone(), Arc::new(o)))
            .collect();
        let default = origins
            .get(default_name)
            .cloned()
            .ok_or_else(|| ConfigError::MissingDefaultOrigin(default_name.to_string()))?;
        Ok(Self { origins, default })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Origin>> {
        self.origins.get(name)
    }

    /// The origin serving requests no matcher claims.
    pub fn default_origin(&self) -> &Arc<Origin> {
        &self.default
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Origin>> {
        self.origins.values()
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}
