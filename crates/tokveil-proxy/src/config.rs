//! Proxy server configuration.

use std::net::{Ipv4Addr, SocketAddr};

use crate::print::PrintLevel;

pub use tokveil_config::{DEFAULT_MAX_BODY_SIZE, DEFAULT_UPSTREAM};

/// Configuration for the proxy server.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Base URL every request is forwarded to.
    pub upstream: String,
    /// Allowed client IPs. `None` disables filtering.
    pub allowed_ips: Option<Vec<String>>,
    /// How much of each request to print.
    pub print_level: PrintLevel,
    /// Enable per-request logging.
    pub request_logging: bool,
    /// Max request body buffered when printing bodies.
    pub max_body_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            upstream: DEFAULT_UPSTREAM.to_string(),
            allowed_ips: None,
            print_level: PrintLevel::Off,
            request_logging: true,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ProxyConfig {
    pub fn new(bind_addr: SocketAddr, upstream: impl Into<String>) -> Self {
        Self {
            bind_addr,
            upstream: upstream.into(),
            ..Default::default()
        }
    }

    /// Only accept requests from these client IPs.
    pub fn with_allowed_ips(mut self, ips: Vec<String>) -> Self {
        self.allowed_ips = Some(ips);
        self
    }

    pub fn with_print_level(mut self, level: PrintLevel) -> Self {
        self.print_level = level;
        self
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }
}
