//! Opaque handle cache for upstream access tokens.
//!
//! This crate owns the mapping from the random handles handed to clients to
//! the real bearer tokens issued upstream:
//! - [`TokenStore`] is the thread-safe map of handle to [`CachedToken`]
//! - [`generate_handle`] produces unguessable hex handles from the OS RNG
//! - [`Sweeper`] periodically purges expired records until cancelled
//!
//! # Example
//!
//! ```rust,ignore
//! use tokveil_cache::{StoreConfig, Sweeper, TokenStore};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = TokenStore::new(StoreConfig::default());
//! let handle = store.mint("real-access-token")?;
//! assert_eq!(store.redeem(&handle).as_deref(), Some("real-access-token"));
//!
//! let cancel = CancellationToken::new();
//! let sweeper = Sweeper::new(store.clone()).spawn(cancel.clone());
//! ```

mod config;
mod error;
mod handle;
mod record;
mod store;
mod sweeper;

pub use config::{
    DEFAULT_HANDLE_LENGTH, DEFAULT_SWEEP_INTERVAL, DEFAULT_TOKEN_TTL, MAX_DURATION, StoreConfig,
};
pub use error::{Error, Result};
pub use handle::generate_handle;
pub use record::CachedToken;
pub use store::TokenStore;
pub use sweeper::Sweeper;
