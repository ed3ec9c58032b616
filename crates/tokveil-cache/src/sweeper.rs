//! Background eviction of expired token records.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MAX_DURATION;
use crate::store::TokenStore;

/// Periodic task that purges expired records from a [`TokenStore`].
///
/// Lookups already refuse expired records, so the sweep only bounds how long
/// dead records occupy memory.
#[derive(Debug, Clone)]
pub struct Sweeper {
    store: TokenStore,
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper using the store's configured interval.
    pub fn new(store: TokenStore) -> Self {
        let interval = store.config().sweep_interval;
        Self { store, interval }
    }

    /// Override the sweep interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Get the sweep interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one sweep now.
    pub fn sweep(&self) -> usize {
        self.store.sweep_expired()
    }

    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first sweep runs immediately. The task exits once `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run the sweep loop until `cancel` fires.
    ///
    /// Intervals above [`MAX_DURATION`] are clamped.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.interval.min(MAX_DURATION));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            "Token sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = self.sweep();
                    debug!(removed, remaining = self.store.len(), "Token sweep finished");
                }
            }
        }

        info!("Token sweeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::record::CachedToken;
    use std::time::Instant;

    #[test]
    fn test_interval_from_store_config() {
        let store = TokenStore::new(StoreConfig::new().with_sweep_interval(Duration::from_secs(7)));
        let sweeper = Sweeper::new(store);
        assert_eq!(sweeper.interval(), Duration::from_secs(7));

        let sweeper = sweeper.with_interval(Duration::from_secs(1));
        assert_eq!(sweeper.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_spawned_sweeper_evicts_and_stops() {
        let store = TokenStore::new(StoreConfig::default());
        store.set(
            "dead",
            CachedToken {
                real_token: "x".to_string(),
                expires_at: Instant::now() - Duration::from_millis(1),
            },
        );
        store.set("live", CachedToken::new("y", Duration::from_secs(60)));

        let cancel = CancellationToken::new();
        let handle = Sweeper::new(store.clone())
            .with_interval(Duration::from_millis(10))
            .spawn(cancel.clone());

        // First tick fires immediately; give it a few intervals
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!store.has("dead"));
        assert!(store.has("live"));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_huge_interval_sweeps_once_and_stops() {
        let store = TokenStore::new(StoreConfig::default());
        store.set(
            "dead",
            CachedToken {
                real_token: "x".to_string(),
                expires_at: Instant::now() - Duration::from_millis(1),
            },
        );

        let cancel = CancellationToken::new();
        let handle = Sweeper::new(store.clone())
            .with_interval(Duration::from_secs(u64::MAX))
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!store.has("dead"));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_picks_up_records_expiring_later() {
        let store = TokenStore::new(StoreConfig::new().with_ttl(Duration::from_millis(20)));
        let handle = store.mint("short-lived").unwrap();

        let cancel = CancellationToken::new();
        let task = Sweeper::new(store.clone())
            .with_interval(Duration::from_millis(10))
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!store.has(&handle));

        cancel.cancel();
        task.await.unwrap();
    }
}
