//! Error types for pool operations

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("entertainer pool exhausted")]
    PoolExhausted,

    #[error("no entertainer at index {index} (pool size {len})")]
    InvalidIndex { index: usize, len: usize },

    #[error(transparent)]
    Gateway(#[from] gateway::Error),
}

impl Error {
    /// Whether the failure is an allocation problem rather than a
    /// remote-service one. Allocation failures abandon the claim but
    /// must not abort the polling loop.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Error::PoolExhausted | Error::InvalidIndex { .. })
    }
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
