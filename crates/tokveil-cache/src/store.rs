//! Thread-safe store of opaque handles to cached tokens.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::handle::generate_handle;
use crate::record::CachedToken;

/// How many fresh handles `mint` tries before giving up on collisions.
const MINT_ATTEMPTS: usize = 3;

/// Store of cached tokens keyed by opaque handle.
///
/// Every operation takes the lock for exactly one read or write and never
/// across an await point, so request handlers and the sweeper only ever
/// contend for the duration of a single map access. Reads share the lock;
/// writes are exclusive.
///
/// Cloning is cheap and yields a handle to the same underlying map.
pub struct TokenStore {
    inner: Arc<RwLock<HashMap<String, CachedToken>>>,
    config: Arc<StoreConfig>,
}

impl TokenStore {
    /// Create an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Get the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Insert or replace the record under `handle`.
    pub fn set(&self, handle: &str, record: CachedToken) {
        self.inner.write().insert(handle.to_string(), record);
        trace!("Token record set");
    }

    /// Insert the record only if `handle` is not already present.
    pub fn insert_new(&self, handle: &str, record: CachedToken) -> Result<()> {
        match self.inner.write().entry(handle.to_string()) {
            Entry::Occupied(_) => Err(Error::HandleCollision),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Get a copy of the record under `handle`, expired or not.
    pub fn get(&self, handle: &str) -> Option<CachedToken> {
        self.inner.read().get(handle).cloned()
    }

    /// Check whether a record exists under `handle`.
    pub fn has(&self, handle: &str) -> bool {
        self.inner.read().contains_key(handle)
    }

    /// Remove the record under `handle`, returning whether one existed.
    pub fn delete(&self, handle: &str) -> bool {
        self.inner.write().remove(handle).is_some()
    }

    /// Snapshot of the handles present at call time.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().keys().cloned().collect()
    }

    /// Get the number of stored records, including not yet swept dead ones.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Resolve a handle to its real token and extend the record's expiry.
    ///
    /// An expired record is treated as a miss and removed on the spot, so a
    /// dead handle never satisfies a substitution even if the sweeper has not
    /// run yet. Lookup, expiry check and refresh happen under one write lock.
    pub fn redeem(&self, handle: &str) -> Option<String> {
        let mut inner = self.inner.write();
        let now = Instant::now();

        let expired = inner.get(handle)?.is_expired_at(now);
        if expired {
            inner.remove(handle);
            debug!("Expired handle presented, record evicted");
            return None;
        }

        let record = inner.get_mut(handle)?;
        record.refresh(self.config.ttl);
        Some(record.real_token.clone())
    }

    /// Store `real_token` under a freshly generated handle and return the handle.
    pub fn mint(&self, real_token: &str) -> Result<String> {
        for _ in 0..MINT_ATTEMPTS {
            let handle = generate_handle(self.config.handle_length)?;
            let record = CachedToken::new(real_token, self.config.ttl);

            match self.insert_new(&handle, record) {
                Ok(()) => {
                    debug!(cache_size = self.len(), "Minted opaque handle");
                    return Ok(handle);
                }
                Err(Error::HandleCollision) => {
                    debug!("Generated handle collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::HandleCollision)
    }

    /// Remove the record under `handle` if it is expired at `now`.
    ///
    /// The expiry is re-checked against the live record under the write lock,
    /// so a record refreshed after a key snapshot was taken survives.
    pub fn remove_if_expired(&self, handle: &str, now: Instant) -> bool {
        let mut inner = self.inner.write();
        let expired = inner
            .get(handle)
            .is_some_and(|record| record.is_expired_at(now));
        if expired {
            inner.remove(handle);
        }
        expired
    }

    /// Remove every expired record and return how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let removed = self
            .keys()
            .iter()
            .filter(|handle| self.remove_if_expired(handle, now))
            .count();

        if removed > 0 {
            debug!(count = removed, "Swept expired token records");
        }

        removed
    }
}

impl Clone for TokenStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: Arc::clone(&self.config),
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("len", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
