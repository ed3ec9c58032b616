//! Start command - runs the token proxy until Ctrl-C.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tokveil_cache::{StoreConfig, Sweeper, TokenStore};
use tokveil_config::TokveilConfig;
use tokveil_proxy::{PrintLevel, ProxyConfig, ProxyServer};
use tracing::{info, warn};

use super::{ConfigArgs, Context};

/// Arguments for the start command.
#[derive(Args, Debug)]
pub struct StartArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Also write JSON logs to daily files in this directory
    #[arg(long, env = "TOKVEIL_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let loaded = args.config.load()?;

    if ctx.verbose {
        let sources = loaded.loaded_from();
        if sources.is_empty() {
            info!("No config files found, using defaults + CLI args");
        }
        for source in sources {
            info!(path = %source.display(), "Loaded config");
        }
    }

    let config = loaded.config;
    let store = TokenStore::new(store_config(&config));
    let server = ProxyServer::new(proxy_config(&config)?, store.clone())?;

    let cancel = CancellationToken::new();
    let sweeper = Sweeper::new(store).spawn(cancel.clone());

    let served = server.run_until(shutdown_signal()).await;

    info!("Shutting down");
    cancel.cancel();
    sweeper.await?;

    served?;
    Ok(())
}

fn store_config(config: &TokveilConfig) -> StoreConfig {
    StoreConfig::new()
        .with_ttl(config.cache.ttl())
        .with_sweep_interval(config.cache.sweep_interval())
        .with_handle_length(config.cache.handle_length)
}

fn proxy_config(config: &TokveilConfig) -> Result<ProxyConfig> {
    let mut proxy = ProxyConfig::new(config.listen_addr()?, config.server.upstream.clone())
        .with_print_level(PrintLevel::try_from(config.logging.print_level)?)
        .with_max_body_size(config.server.max_body_size);

    if let Some(allowed) = config.allow_list() {
        proxy = proxy.with_allowed_ips(allowed.to_vec());
    }

    Ok(proxy)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_config_follows_cache_section() {
        let mut config = TokveilConfig::default();
        config.cache.ttl_secs = 60;
        config.cache.sweep_interval_secs = 30;
        config.cache.handle_length = 48;

        let store = store_config(&config);
        assert_eq!(store.ttl, Duration::from_secs(60));
        assert_eq!(store.sweep_interval, Duration::from_secs(30));
        assert_eq!(store.handle_length, 48);
    }

    #[test]
    fn test_proxy_config_allow_list_only_when_enabled() {
        let mut config = TokveilConfig::default();
        config.filter.allowed_ips = vec!["10.0.0.1".to_string()];

        let proxy = proxy_config(&config).unwrap();
        assert!(proxy.allowed_ips.is_none());

        config.filter.enabled = true;
        config.logging.print_level = 2;
        let proxy = proxy_config(&config).unwrap();
        assert_eq!(proxy.allowed_ips, Some(vec!["10.0.0.1".to_string()]));
        assert_eq!(proxy.print_level, PrintLevel::ClientIp);
        assert_eq!(proxy.bind_addr.port(), 8080);
    }
}
