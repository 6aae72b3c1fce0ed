use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::IdTokenConfig;
use crate::error::SecurityError;

/// The subset of a JWK we need to rebuild an RSA verification key.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

impl Jwk {
    fn decoding_key(&self) -> Result<DecodingKey, SecurityError> {
        match self.kty.as_str() {
            "RSA" => {
                let (Some(n), Some(e)) = (self.n.as_deref(), self.e.as_deref()) else {
                    return Err(SecurityError::ValidationFailed(
                        "RSA key missing 'n' or 'e' component".into(),
                    ));
                };
                DecodingKey::from_rsa_components(n, e).map_err(|err| {
                    SecurityError::ValidationFailed(format!("Bad RSA key components: {err}"))
                })
            }
            other => Err(SecurityError::ValidationFailed(format!(
                "Unsupported key type: {other}"
            ))),
        }
    }
}

struct KeyStore {
    keys: HashMap<String, Jwk>,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
}

/// Provider signing keys, indexed by `kid`.
///
/// Keys are refetched once the TTL has elapsed, and immediately (subject to a
/// minimum interval) when a token names a `kid` the cache has not seen.
pub struct JwksCache {
    store: RwLock<KeyStore>,
    jwks_url: String,
    ttl: Duration,
    min_refresh_interval: Duration,
    client: reqwest::Client,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    /// Create the cache and fetch the key set once.
    pub async fn new(config: &IdTokenConfig, client: reqwest::Client) -> Result<Self, SecurityError> {
        let cache = Self {
            store: RwLock::new(KeyStore {
                keys: HashMap::new(),
                fetched_at: None,
                last_attempt: None,
            }),
            jwks_url: config.jwks_url.clone(),
            ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
            min_refresh_interval: Duration::from_secs(config.jwks_min_refresh_interval_secs),
            client,
            refresh_lock: Mutex::new(()),
        };
        cache.fetch().await?;
        Ok(cache)
    }

    /// Decoding key for `kid`, refreshing the set first if needed.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, SecurityError> {
        let force = {
            let store = self.store.read().await;
            match store.keys.get(kid) {
                Some(jwk) if !is_stale(store.fetched_at, self.ttl) => return jwk.decoding_key(),
                Some(_) => false,
                None => true,
            }
        };

        if let Err(err) = self.try_refresh(force).await {
            warn!(error = %err, "JWKS refresh failed, using cached keys");
        }

        let store = self.store.read().await;
        store
            .keys
            .get(kid)
            .ok_or_else(|| SecurityError::UnknownKeyId(kid.to_string()))?
            .decoding_key()
    }

    async fn fetch(&self) -> Result<(), SecurityError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SecurityError::JwksFetchError(e.to_string()))?;

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| SecurityError::JwksFetchError(format!("Failed to parse JWKS: {e}")))?;

        let keys: HashMap<String, Jwk> = set
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.kid.clone().map(|kid| (kid, jwk)))
            .collect();
        debug!(count = keys.len(), url = %self.jwks_url, "Fetched JWKS");

        let now = Instant::now();
        let mut store = self.store.write().await;
        store.keys = keys;
        store.fetched_at = Some(now);
        store.last_attempt = Some(now);
        Ok(())
    }

    async fn try_refresh(&self, force: bool) -> Result<(), SecurityError> {
        if !self.should_refresh(force).await {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock.
        if !self.should_refresh(force).await {
            return Ok(());
        }

        self.store.write().await.last_attempt = Some(Instant::now());
        self.fetch().await
    }

    async fn should_refresh(&self, force: bool) -> bool {
        let store = self.store.read().await;
        (force || is_stale(store.fetched_at, self.ttl))
            && can_attempt(store.last_attempt, self.min_refresh_interval)
    }
}

fn is_stale(fetched_at: Option<Instant>, ttl: Duration) -> bool {
    fetched_at.map_or(true, |ts| ts.elapsed() >= ttl)
}

fn can_attempt(last_attempt: Option<Instant>, min_interval: Duration) -> bool {
    last_attempt.map_or(true, |ts| ts.elapsed() >= min_interval)
}
