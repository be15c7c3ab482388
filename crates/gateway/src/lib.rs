//! Remote account gateway abstraction
//!
//! Defines the `Gateway` trait that decouples the watch/claim logic from
//! the remote service's transport. `HttpGateway` talks to the real JSON
//! API; tests script the same trait in memory. The trait covers exactly
//! the three operations the bot needs: sign in with a credential, look a
//! user up by id, and set the signed-in session's nickname.

pub mod classify;
pub mod error;
pub mod http;

pub use classify::{LookupOutcome, classify_lookup};
pub use error::{Error, Result};
pub use http::HttpGateway;

use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;

/// An authenticated session returned by `authenticate`.
///
/// The token is the bearer credential for follow-up calls; `account_id`
/// identifies the signed-in account for logging.
#[derive(Debug, Clone)]
pub struct Session {
    pub account_id: String,
    pub token: String,
}

/// Point-in-time view of a remote user, returned by `lookup_user`.
///
/// Never stored: the reconciliation loop uses it for one comparison and
/// drops it. A user can exist without a nickname (fresh accounts), hence
/// the Option.
#[derive(Debug, Clone, Deserialize)]
pub struct UserSnapshot {
    #[serde(rename = "username")]
    pub nickname: Option<String>,
}

/// Abstraction over the remote account service.
///
/// The reconciliation engine drives `lookup_user` (read path); the
/// entertainer pool drives `authenticate` and `set_nickname` (claim
/// path). Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn Gateway>`).
pub trait Gateway: Send + Sync {
    /// Identifier for logging (e.g. "http", "scripted")
    fn id(&self) -> &str;

    /// Sign in with a credential, returning an authenticated session.
    ///
    /// Fails with `Error::Auth` when the service rejects the credential.
    fn authenticate<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Session>> + Send + 'a>>;

    /// Fetch the current snapshot of a user by remote id.
    ///
    /// `Ok(None)` means the user does not exist (not an error; the
    /// caller retries next cycle). Transient failures surface as
    /// retriable errors (`Error::is_retriable`).
    fn lookup_user<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UserSnapshot>>> + Send + 'a>>;

    /// Set the session's nickname.
    ///
    /// Fails with `Error::NicknameRejected` when the name is already
    /// taken or invalid.
    fn set_nickname<'a>(
        &'a self,
        session: &'a Session,
        nickname: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
