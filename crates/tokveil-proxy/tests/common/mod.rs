//! Common test utilities for integration tests.

use std::net::SocketAddr;

use anyhow::Result;
use reqwest::Client;
use tokio::sync::oneshot;
use tokveil_cache::{StoreConfig, TokenStore};
use tokveil_proxy::{ProxyConfig, ProxyServer};
use wiremock::MockServer;

/// A proxy running in the background in front of a mock upstream.
pub struct TestProxy {
    /// The proxy's address.
    pub addr: SocketAddr,
    /// HTTP client for talking to the proxy.
    pub client: Client,
    /// Store shared with the running proxy.
    pub store: TokenStore,
    /// Mock token endpoint the proxy forwards to.
    pub upstream: MockServer,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestProxy {
    /// Start a proxy with default configuration.
    pub async fn start() -> Result<Self> {
        Self::start_with(TokenStore::new(StoreConfig::default()), |c| c).await
    }

    /// Start a proxy with a given store and config adjustments.
    pub async fn start_with(
        store: TokenStore,
        configure: impl FnOnce(ProxyConfig) -> ProxyConfig,
    ) -> Result<Self> {
        let upstream = MockServer::start().await;

        let config = configure(
            ProxyConfig::new("127.0.0.1:0".parse()?, upstream.uri()).with_request_logging(false),
        );

        let (tx, rx) = oneshot::channel::<()>();
        let addr = ProxyServer::new(config, store.clone())?
            .run_with_shutdown(async {
                rx.await.ok();
            })
            .await?;

        Ok(Self {
            addr,
            client: Client::new(),
            store,
            upstream,
            shutdown: Some(tx),
        })
    }

    /// Full URL for a path on the proxy.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests the upstream has seen.
    pub async fn upstream_hits(&self) -> usize {
        self.upstream
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or_default()
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
