//! Error types for token cache operations.

/// Error type for token cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The secure random source could not produce bytes.
    #[error("Random source unavailable: {0}")]
    RandomSource(String),

    /// A record already exists under the handle.
    #[error("Handle already in use")]
    HandleCollision,

    /// A handle of this length cannot be generated.
    #[error("Invalid handle length: {0}")]
    InvalidHandleLength(usize),
}

/// Result type for token cache operations.
pub type Result<T> = std::result::Result<T, Error>;
