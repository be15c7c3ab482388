//! Pool ownership and the claim sequence
//!
//! The pool owns the remaining entertainer credentials in file order and
//! is mutated only by the single polling task, so access is `&mut self`
//! with no interior locking. Selection is a fixed two-branch policy, not
//! rotation: the front credential is reserved for the priority nickname
//! when one is configured.

use std::sync::Arc;

use gateway::{Gateway, Session};
use roster::Entertainer;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Pool of unused entertainer credentials plus the claim routing policy.
pub struct EntertainerPool {
    entertainers: Vec<Entertainer>,
    priority_nickname: Option<String>,
    gateway: Arc<dyn Gateway>,
}

impl EntertainerPool {
    /// Create a pool over the loaded credentials.
    ///
    /// `priority_nickname` reserves the credential at index 0 for claims
    /// of that exact name; all other claims then draw from index 1.
    pub fn new(
        entertainers: Vec<Entertainer>,
        priority_nickname: Option<String>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        info!(entertainers = entertainers.len(), "entertainer pool initialized");
        Self {
            entertainers,
            priority_nickname,
            gateway,
        }
    }

    /// Number of unused credentials remaining.
    pub fn len(&self) -> usize {
        self.entertainers.len()
    }

    /// Whether the pool has been fully spent.
    pub fn is_empty(&self) -> bool {
        self.entertainers.is_empty()
    }

    /// Route a claim to a pool index.
    ///
    /// With a priority nickname configured: the priority name takes
    /// index 0, everything else takes index 1. Without one, always 0.
    pub fn select_index(&self, nickname: &str) -> usize {
        match &self.priority_nickname {
            Some(priority) if nickname == priority => 0,
            Some(_) => 1,
            None => 0,
        }
    }

    /// Remove the credential at `index` and sign in with it.
    ///
    /// The credential leaves the pool before authentication is attempted
    /// and is never restored: a sign-in failure means the credential is
    /// lost, matching the service's one-identity-per-credential rule.
    pub async fn consume(&mut self, index: usize) -> Result<Session> {
        if self.entertainers.is_empty() {
            return Err(Error::PoolExhausted);
        }
        if index >= self.entertainers.len() {
            return Err(Error::InvalidIndex {
                index,
                len: self.entertainers.len(),
            });
        }

        let entertainer = self.entertainers.remove(index);
        debug!(
            email = %entertainer.email,
            remaining = self.entertainers.len(),
            "consuming entertainer credential"
        );

        let session = self
            .gateway
            .authenticate(&entertainer.email, entertainer.password.expose())
            .await
            .inspect_err(|e| {
                error!(email = %entertainer.email, error = %e, "entertainer sign-in failed, credential lost");
            })?;

        Ok(session)
    }

    /// Claim a vacated nickname: select, consume, set.
    ///
    /// Pool errors and gateway failures both propagate; the caller
    /// decides which of them abandon the claim and which abort the run.
    pub async fn claim(&mut self, nickname: &str) -> Result<()> {
        let claim_id = format!("claim_{}", Uuid::new_v4().as_simple());
        let index = self.select_index(nickname);

        let session = self.consume(index).await?;
        self.gateway.set_nickname(&session, nickname).await?;

        info!(
            claim_id = %claim_id,
            account_id = %session.account_id,
            nickname,
            remaining = self.entertainers.len(),
            "nickname claimed"
        );
        Ok(())
    }
}
