use std::collections::HashMap;
use std::time::Duration;

use reqwest::{redirect, Client};
use tucson_core::{Origin, OriginRegistry};

use crate::error::ProxyError;

/// Bound on one proxied exchange, connect to last body byte.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the HTTP client for one origin.
///
/// Redirects are relayed to the caller, never followed.
pub fn build_client(origin: &Origin) -> Result<Client, ProxyError> {
    Client::builder()
        .redirect(redirect::Policy::none())
        .timeout(UPSTREAM_TIMEOUT)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .danger_accept_invalid_certs(origin.insecure_tls)
        .no_proxy()
        .build()
        .map_err(|e| ProxyError::Client(format!("origin '{}': {e}", origin.name)))
}

/// One client per configured origin, built once at startup.
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    clients: HashMap<String, Client>,
}

impl UpstreamClients {
    pub fn new(registry: &OriginRegistry) -> Result<Self, ProxyError> {
        let clients = registry
            .iter()
            .map(|origin| Ok((origin.name.clone(), build_client(origin)?)))
            .collect::<Result<HashMap<_, _>, ProxyError>>()?;
        Ok(Self { clients })
    }

    pub fn get(&self, origin: &str) -> Option<&Client> {
        self.clients.get(origin)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
