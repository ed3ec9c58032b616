//! CLI command handlers.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokveil_config::{ConfigOverrides, LoadedConfig};

pub mod check_config;
pub mod start;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
}

/// Configuration flags shared by commands that load config.
///
/// Flags and environment variables override config file values.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Upstream base URL to forward to
    #[arg(long, env = "TOKVEIL_UPSTREAM")]
    pub upstream: Option<String>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, env = "TOKVEIL_LISTEN")]
    pub listen: Option<String>,

    /// Reject clients whose IP is not in the allow-list
    #[arg(long, env = "TOKVEIL_FILTER_IP")]
    pub filter_ip: bool,

    /// Allowed client IPs, separated by commas, semicolons or whitespace
    #[arg(long, env = "TOKVEIL_ALLOWED_IPS")]
    pub allowed_ips: Option<String>,

    /// Request print level (0-3)
    #[arg(long, env = "TOKVEIL_PRINT_LEVEL")]
    pub print_level: Option<u8>,
}

impl ConfigArgs {
    /// Overrides to apply on top of file values.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            upstream: self.upstream.clone(),
            listen: self.listen.clone(),
            filter_ip: self.filter_ip.then_some(true),
            allowed_ips: self.allowed_ips.clone(),
            print_level: self.print_level,
        }
    }

    /// Load config files, apply overrides and validate the result.
    pub fn load(&self) -> Result<LoadedConfig> {
        let mut loaded = tokveil_config::load_config(self.config.as_deref())?;
        loaded.config.apply_overrides(&self.overrides());
        loaded.config.validate()?;
        Ok(loaded)
    }
}
