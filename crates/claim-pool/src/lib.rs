//! Entertainer credential pool for nickname claims
//!
//! Manages the disposable sign-in credentials the bot spends to occupy
//! nicknames. Each credential authenticates exactly one service identity,
//! so consumption is permanent: a credential leaves the pool before its
//! sign-in is attempted and is never returned, even on failure.
//!
//! Claim lifecycle:
//! 1. Reconciliation detects a tracked nickname moving away from its
//!    recorded value
//! 2. `select_index` routes the claim: index 0 is reserved for the
//!    configured priority nickname, index 1 covers everything else
//! 3. `consume` removes the credential and signs in via the gateway
//! 4. `set_nickname` occupies the vacated name with the new session
//! 5. The pool only shrinks; an empty pool fails claims with
//!    `PoolExhausted`

pub mod error;
pub mod pool;

pub use error::{Error, Result};
pub use pool::EntertainerPool;
