use super::{ConfigError, LoggingSettings, OidcSettings, Settings};
use crate::matcher::{Matcher, MatcherTable};
use crate::origin::{Origin, OriginRegistry};

/// Validated, immutable gateway configuration.
///
/// Built once at startup and shared read-only by every request handler.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    listen: String,
    registry: OriginRegistry,
    matchers: MatcherTable,
    signing_key: String,
    oidc: OidcSettings,
    logging: LoggingSettings,
}

impl GatewayConfig {
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        let listen = settings.listen.trim().to_string();
        if listen.is_empty() {
            return Err(ConfigError::Invalid {
                key: "listen",
                reason: "listen address is empty".to_string(),
            });
        }

        let origins = settings
            .origins
            .iter()
            .map(|(name, origin)| Origin::from_settings(name, origin))
            .collect::<Result<Vec<_>, _>>()?;
        let registry = OriginRegistry::new(origins, &settings.default_origin)?;

        let mut rules = Vec::with_capacity(settings.matchers.len());
        for m in &settings.matchers {
            if registry.get(&m.origin).is_none() {
                tracing::warn!(
                    path = %m.path,
                    origin = %m.origin,
                    "Matcher refers to unknown origin and will never match"
                );
            }
            rules.push(Matcher::new(&m.path, m.origin.clone())?);
        }

        let signing_key = match settings.signing_key.filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => {
                tracing::warn!(
                    "No signing key configured, generated a random one; \
                     sessions will not survive a restart"
                );
                uuid::Uuid::new_v4().to_string()
            }
        };

        Ok(Self {
            listen,
            registry,
            matchers: MatcherTable::new(rules),
            signing_key,
            oidc: settings.oidc,
            logging: settings.logging,
        })
    }

    pub fn listen(&self) -> &str {
        &self.listen
    }

    pub fn registry(&self) -> &OriginRegistry {
        &self.registry
    }

    pub fn matchers(&self) -> &MatcherTable {
        &self.matchers
    }

    /// Secret used to sign and verify session tokens.
    pub fn signing_key(&self) -> &str {
        &self.signing_key
    }

    pub fn oidc(&self) -> &OidcSettings {
        &self.oidc
    }

    pub fn logging(&self) -> &LoggingSettings {
        &self.logging
    }
}
