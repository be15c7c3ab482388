//! Error types for gateway operations

/// Errors from remote service calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("access denied: {0}")]
    Denied(String),

    #[error("user lookup failed: {0}")]
    Lookup(String),

    #[error("nickname rejected: {0}")]
    NicknameRejected(String),

    #[error("gateway request failed: {0}")]
    Http(String),
}

impl Error {
    /// Whether the caller should retry the same operation later.
    ///
    /// Lookup and transport failures are transient; credential and
    /// nickname rejections are not.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Lookup(_) | Error::Http(_))
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;
