//! Shared state for the proxy handler and middleware.

use std::sync::Arc;

use tokveil_cache::TokenStore;

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::forward::Forwarder;

/// State shared by every request.
#[derive(Debug, Clone)]
pub struct ProxyState {
    /// Handle to real-token mapping.
    pub store: TokenStore,
    /// Client for the upstream server.
    pub forwarder: Forwarder,
    /// Server configuration.
    pub config: Arc<ProxyConfig>,
}

impl ProxyState {
    /// Build state around an existing store.
    pub fn new(config: ProxyConfig, store: TokenStore) -> Result<Self> {
        let forwarder = Forwarder::new(&config.upstream)?;
        Ok(Self {
            store,
            forwarder,
            config: Arc::new(config),
        })
    }
}
