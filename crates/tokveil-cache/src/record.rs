//! Cached token records and their expiry.

use std::fmt;
use std::time::{Duration, Instant};

use crate::config::MAX_DURATION;

/// A real upstream token held behind an opaque handle.
#[derive(Clone, PartialEq, Eq)]
pub struct CachedToken {
    /// The access token exactly as issued upstream.
    pub real_token: String,

    /// Absolute expiry. Records past this instant are dead.
    pub expires_at: Instant,
}

impl CachedToken {
    /// Create a record expiring `ttl` from now.
    pub fn new(real_token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            real_token: real_token.into(),
            expires_at: deadline(ttl),
        }
    }

    /// Check whether the record is expired at `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Check whether the record is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Push the expiry out to `now + ttl`.
    pub fn refresh(&mut self, ttl: Duration) {
        self.expires_at = deadline(ttl);
    }

    /// Time left before expiry (zero once expired).
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// `now + ttl`, saturating at [`MAX_DURATION`] instead of overflowing.
fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl.min(MAX_DURATION)).unwrap_or(now)
}

// Never print the real token.
impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("real_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
