//! Roster file loading and the tracked-target state type
//!
//! Entries are validated once at load: empty or duplicate user ids fail
//! startup instead of surfacing as per-cycle skips. Nickname state uses
//! `Option<String>` internally; the file's empty-string sentinel is
//! mapped at the deserialization boundary so the on-disk format stays
//! unchanged.

use std::path::Path;

use common::{Error, Result, Secret};
use serde::Deserialize;
use tracing::info;

/// A disposable sign-in credential used once to occupy a nickname.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "(String, String)")]
pub struct Entertainer {
    pub email: String,
    pub password: Secret<String>,
}

impl From<(String, String)> for Entertainer {
    fn from((email, password): (String, String)) -> Self {
        Self {
            email,
            password: Secret::new(password),
        }
    }
}

/// A remote account whose nickname is being watched.
///
/// `last_nickname` is `None` until the nickname is first observed, then
/// holds the value the bot is watching for movement away from. The only
/// legal transitions are `None -> Some` (record) and removal from the
/// active set (claim dispatched); the field is never overwritten from
/// one value to another.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct TrackedTarget {
    user_id: String,
    last_nickname: Option<String>,
}

impl From<(String, String)> for TrackedTarget {
    fn from((user_id, nickname): (String, String)) -> Self {
        let last_nickname = if nickname.is_empty() {
            None
        } else {
            Some(nickname)
        };
        Self {
            user_id,
            last_nickname,
        }
    }
}

impl TrackedTarget {
    pub fn new(user_id: impl Into<String>, last_nickname: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            last_nickname,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn last_nickname(&self) -> Option<&str> {
        self.last_nickname.as_deref()
    }

    /// Record the first observed nickname.
    pub fn record(&mut self, nickname: String) {
        debug_assert!(self.last_nickname.is_none());
        self.last_nickname = Some(nickname);
    }
}

/// The loaded input file: entertainer credentials plus tracked targets.
#[derive(Debug, Deserialize)]
pub struct Roster {
    pub entertainers: Vec<Entertainer>,
    #[serde(rename = "trackeds")]
    pub targets: Vec<TrackedTarget>,
}

impl Roster {
    /// Load and validate the roster from the given JSON file.
    ///
    /// Fails on a missing or malformed file, on an empty entertainer
    /// email, or on an empty or duplicate tracked user id. List order
    /// is preserved: entertainer index 0/1 carry the selection policy's
    /// meaning, and targets are polled in file order.
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path).await?;
        let roster: Roster = serde_json::from_str(&contents)?;
        roster.validate()?;
        info!(
            path = %path.display(),
            entertainers = roster.entertainers.len(),
            targets = roster.targets.len(),
            "loaded roster"
        );
        Ok(roster)
    }

    fn validate(&self) -> Result<()> {
        for entertainer in &self.entertainers {
            if entertainer.email.is_empty() {
                return Err(Error::Config(
                    "entertainer with empty email in roster".into(),
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for target in &self.targets {
            if target.user_id.is_empty() {
                return Err(Error::Config("tracked entry with empty user id".into()));
            }
            if !seen.insert(target.user_id.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate tracked user id: {}",
                    target.user_id
                )));
            }
        }
        Ok(())
    }
}
