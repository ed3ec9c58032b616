//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! upstream = "http://keycloak:8080"
//!
//! [filter]
//! enabled = true
//! allowed_ips = ["10.0.0.1", "10.0.0.2"]   # or "10.0.0.1, 10.0.0.2"
//!
//! [logging]
//! print_level = 1
//!
//! [cache]
//! ttl_secs = 3600
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, Result};
use crate::list::split_list;

/// Default upstream token endpoint base URL.
pub const DEFAULT_UPSTREAM: &str = "http://keycloak:8080";

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Default max buffered request body (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Highest request print level.
pub const MAX_PRINT_LEVEL: u8 = 3;

/// Upper bound for `ttl_secs` and `sweep_interval_secs` (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokveilConfig {
    pub server: ServerSection,
    pub filter: FilterSection,
    pub logging: LoggingSection,
    pub cache: CacheSection,
}

impl TokveilConfig {
    /// Parse a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Apply CLI / environment overrides on top of file values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref upstream) = overrides.upstream {
            self.server.upstream = upstream.clone();
        }
        if let Some(ref listen) = overrides.listen {
            self.server.listen = listen.clone();
        }
        if let Some(enabled) = overrides.filter_ip {
            self.filter.enabled = enabled;
        }
        if let Some(ref ips) = overrides.allowed_ips {
            self.filter.allowed_ips = split_list(ips);
        }
        if let Some(level) = overrides.print_level {
            self.logging.print_level = level;
        }
    }

    /// Check the configuration for values the proxy must refuse to start with.
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        self.upstream_url()?;

        if self.filter.enabled && self.filter.allowed_ips.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        if self.logging.print_level > MAX_PRINT_LEVEL {
            return Err(ConfigError::invalid(
                "logging.print_level",
                format!("must be between 0 and {}", MAX_PRINT_LEVEL),
            ));
        }
        check_duration("cache.ttl_secs", self.cache.ttl_secs)?;
        check_duration("cache.sweep_interval_secs", self.cache.sweep_interval_secs)?;
        if self.cache.handle_length == 0 {
            return Err(ConfigError::invalid(
                "cache.handle_length",
                "must be positive",
            ));
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen
            .parse()
            .map_err(|e| ConfigError::invalid("server.listen", format!("{}", e)))
    }

    /// Parsed upstream base URL. Only http and https are accepted.
    pub fn upstream_url(&self) -> Result<url::Url> {
        let url = url::Url::parse(&self.server.upstream)
            .map_err(|e| ConfigError::invalid("server.upstream", e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::invalid(
                "server.upstream",
                format!("unsupported scheme '{}'", other),
            )),
        }
    }

    /// Allow-list in effect, or `None` when filtering is disabled.
    pub fn allow_list(&self) -> Option<&[String]> {
        self.filter
            .enabled
            .then_some(self.filter.allowed_ips.as_slice())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to listen on.
    pub listen: String,
    /// Base URL requests are forwarded to.
    pub upstream: String,
    /// Max request body buffered for printing.
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            upstream: DEFAULT_UPSTREAM.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// `[filter]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Reject clients whose IP is not allow-listed.
    pub enabled: bool,
    /// Allowed client IPs, as a TOML array or a single delimited string.
    #[serde(deserialize_with = "deserialize_ip_list")]
    pub allowed_ips: Vec<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Request print verbosity: 0 off, 1 headers, 2 + client IP, 3 + body.
    pub print_level: u8,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Token TTL in seconds, refreshed on every use.
    pub ttl_secs: u64,
    /// Seconds between eviction sweeps.
    pub sweep_interval_secs: u64,
    /// Hex characters per minted handle.
    pub handle_length: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 3600,
            handle_length: 32,
        }
    }
}

impl CacheSection {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Overrides
// ─────────────────────────────────────────────────────────────────────────────

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub upstream: Option<String>,
    pub listen: Option<String>,
    pub filter_ip: Option<bool>,
    /// Delimited allow-list string.
    pub allowed_ips: Option<String>,
    pub print_level: Option<u8>,
}

fn check_duration(field: &str, secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_DURATION_SECS {
        return Err(ConfigError::invalid(
            field,
            format!("must be between 1 and {}", MAX_DURATION_SECS),
        ));
    }
    Ok(())
}

fn deserialize_ip_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IpList {
        Delimited(String),
        List(Vec<String>),
    }

    Ok(match IpList::deserialize(deserializer)? {
        IpList::Delimited(s) => split_list(&s),
        IpList::List(items) => items
            .iter()
            .flat_map(|item| split_list(item))
            .collect(),
    })
}
