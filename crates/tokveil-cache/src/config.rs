//! Configuration for the token store.

use std::time::Duration;

/// Default lifetime of a cached token, refreshed on every use.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Longest duration the store schedules with. Larger TTLs and sweep
/// intervals saturate here.
pub const MAX_DURATION: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Default number of hex characters in a generated handle (128 bits).
pub const DEFAULT_HANDLE_LENGTH: usize = 32;

/// Configuration for the token store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Time-to-live applied on insert and on every successful redeem.
    pub ttl: Duration,

    /// Interval for the background sweeper.
    pub sweep_interval: Duration,

    /// Length of minted handles, in hex characters.
    pub handle_length: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TOKEN_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            handle_length: DEFAULT_HANDLE_LENGTH,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL for cached tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the length of minted handles.
    pub fn with_handle_length(mut self, length: usize) -> Self {
        self.handle_length = length;
        self
    }
}
