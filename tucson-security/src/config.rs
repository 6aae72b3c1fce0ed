use jsonwebtoken::Algorithm;

/// Settings for verifying ID tokens issued by the OIDC provider.
#[derive(Clone, Debug)]
pub struct IdTokenConfig {
    /// URL of the provider's JWKS endpoint (`jwks_uri` from discovery)
    pub jwks_url: String,

    /// Expected `iss` claim
    pub issuer: String,

    /// Client ID that must appear in the `aud` claim
    pub client_id: String,

    /// JWKS cache TTL in seconds (default: 3600)
    pub jwks_cache_ttl_secs: u64,

    /// Minimum interval between JWKS refresh attempts in seconds (default: 10)
    pub jwks_min_refresh_interval_secs: u64,

    /// Accepted signing algorithms. Default: RS256 only.
    pub allowed_algorithms: Vec<Algorithm>,
}

impl IdTokenConfig {
    pub fn new(
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            issuer: issuer.into(),
            client_id: client_id.into(),
            jwks_cache_ttl_secs: 3600,
            jwks_min_refresh_interval_secs: 10,
            allowed_algorithms: vec![Algorithm::RS256],
        }
    }

    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.jwks_cache_ttl_secs = ttl_secs;
        self
    }

    pub fn with_min_refresh_interval(mut self, interval_secs: u64) -> Self {
        self.jwks_min_refresh_interval_secs = interval_secs;
        self
    }

    /// Empty lists make every verification fail.
    pub fn with_allowed_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = Algorithm>,
    ) -> Self {
        self.allowed_algorithms = algorithms.into_iter().collect();
        self
    }
}
