//! Lookup response classification
//!
//! Distinguishes a user that genuinely does not exist (tracked targets
//! keep being polled for it) from transient service failures (cooldown
//! and retry next cycle) and account-level denials.

/// Disposition of a user lookup by HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// 2xx with a body to parse
    Found,
    /// The user id resolves to nothing; not an error
    NotFound,
    /// Transient failure, retry next cycle after cooldown
    Retriable,
    /// The bot's own access is rejected
    Denied,
}

/// Classify a lookup response status.
///
/// 404 is NotFound (the target stays tracked and is polled again).
/// 401/403 mean the bot's session is rejected. 408/429/5xx are
/// transient; anything else unexpected is treated as transient too,
/// since dropping a target on an unknown status would be lossy.
pub fn classify_lookup(status: u16) -> LookupOutcome {
    match status {
        200..=299 => LookupOutcome::Found,
        404 => LookupOutcome::NotFound,
        401 | 403 => LookupOutcome::Denied,
        408 | 429 | 500 | 502 | 503 | 504 => LookupOutcome::Retriable,
        _ => LookupOutcome::Retriable,
    }
}
