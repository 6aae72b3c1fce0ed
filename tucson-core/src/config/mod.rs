mod gateway;
mod loader;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use gateway::GatewayConfig;
pub use loader::{env_key, ENV_PREFIX};

/// Error type for configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    NotFound(PathBuf),
    /// An I/O or YAML parsing error occurred while loading config.
    Load(String),
    /// `default-origin` names an origin that is not declared.
    MissingDefaultOrigin(String),
    /// An origin entry is unusable (empty or malformed URL).
    InvalidOrigin { name: String, reason: String },
    /// A configured header name or value is not valid HTTP.
    InvalidHeader { origin: String, header: String },
    /// A matcher path pattern could not be parsed.
    InvalidPattern { pattern: String, reason: String },
    /// A scalar setting failed validation.
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::MissingDefaultOrigin(name) => {
                write!(f, "Default origin '{name}' is not declared under 'origins'")
            }
            ConfigError::InvalidOrigin { name, reason } => {
                write!(f, "Invalid origin '{name}': {reason}")
            }
            ConfigError::InvalidHeader { origin, header } => {
                write!(f, "Invalid header '{header}' configured for origin '{origin}'")
            }
            ConfigError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid matcher path '{pattern}': {reason}")
            }
            ConfigError::Invalid { key, reason } => {
                write!(f, "Invalid value for '{key}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Raw settings ────────────────────────────────────────────────────────

/// Raw gateway settings as read from YAML, environment and flags.
///
/// Nothing here is validated yet; [`GatewayConfig::from_settings`] turns a
/// `Settings` into the immutable configuration the gateway runs with.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_origin_name")]
    pub default_origin: String,
    #[serde(default)]
    pub signing_key: Option<String>,
    #[serde(default)]
    pub oidc: OidcSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub origins: BTreeMap<String, OriginSettings>,
    #[serde(default)]
    pub matchers: Vec<MatcherSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            default_origin: default_origin_name(),
            signing_key: None,
            oidc: OidcSettings::default(),
            logging: LoggingSettings::default(),
            origins: BTreeMap::new(),
            matchers: Vec::new(),
        }
    }
}

/// One upstream service entry under `origins`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub set_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub add_headers: BTreeMap<String, String>,
    /// Accepted for compatibility with older config files. Unused.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub oidc: bool,
    #[serde(default)]
    pub basicauth: Option<BasicAuthSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicAuthSettings {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// A `{path, origin}` routing rule.
#[derive(Debug, Clone, Deserialize)]
pub struct MatcherSettings {
    pub path: String,
    pub origin: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OidcSettings {
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl Default for OidcSettings {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: default_redirect_url(),
            scopes: default_scopes(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub pretty: bool,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_origin_name() -> String {
    "default".to_string()
}

fn default_redirect_url() -> String {
    "http://localhost:8000/auth/callback".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["openid".to_string()]
}

// ── Loading ─────────────────────────────────────────────────────────────

impl Settings {
    /// Load settings from a YAML file, `.env` and `TUCSON_*` environment variables.
    ///
    /// With `path = None` the file defaults to `$HOME/.tucson.yaml` and may be
    /// absent. An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let content = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Some(loader::read_file(path)?)
            }
            None => match default_config_path() {
                Some(path) if path.exists() => Some(loader::read_file(&path)?),
                _ => None,
            },
        };

        // `.env` never overwrites variables already present in the environment
        let _ = dotenvy::dotenv();

        Self::from_sources(content.as_deref(), std::env::vars())
    }

    /// Parse settings from a YAML string without consulting the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_sources(Some(yaml), std::iter::empty())
    }

    /// Parse settings from an optional YAML document overlaid with the given
    /// environment variables.
    pub fn from_sources<I>(yaml: Option<&str>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = match yaml {
            Some(content) => loader::parse_yaml(content)?,
            None => serde_yaml::Value::Mapping(Default::default()),
        };
        loader::apply_env(&mut tree, env)?;
        serde_yaml::from_value(tree).map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// `$HOME/.tucson.yaml`, when a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| Path::new(&home).join(".tucson.yaml"))
}
