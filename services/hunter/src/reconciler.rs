//! Tracked-account reconciliation
//!
//! One cycle walks the active targets in order, compares each target's
//! remote nickname against the recorded one, and applies exactly one of
//! three transitions: record a first-observed nickname, claim a vacated
//! nickname and drop the target, or nothing. The next active set is
//! rebuilt explicitly each cycle; entries are never deleted while the
//! list is being walked.

use std::sync::Arc;
use std::time::Duration;

use claim_pool::{EntertainerPool, Result};
use gateway::Gateway;
use roster::TrackedTarget;
use tracing::{error, info, warn};

/// Fixed delays applied inside a cycle.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Gap between targets within a cycle
    pub target_delay: Duration,
    /// Wait applied after a transient lookup failure
    pub lookup_cooldown: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            target_delay: Duration::from_secs(2),
            lookup_cooldown: Duration::from_secs(10),
        }
    }
}

/// What one observation means for one target. Claim carries the vacated
/// (previously recorded) nickname, not the newly observed one.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Record(String),
    Claim(String),
    Keep,
}

/// Decide the transition for a target given what the lookup observed.
///
/// Pure decision, no I/O: the first observation of a nickname records
/// it; movement away from a recorded nickname claims the old value;
/// everything else (unchanged, nothing observed yet) keeps the target
/// untouched.
fn decide(last: Option<&str>, observed: Option<String>) -> Step {
    match (last, observed) {
        (None, Some(nickname)) => Step::Record(nickname),
        (Some(old), Some(new)) if new != old => Step::Claim(old.to_string()),
        _ => Step::Keep,
    }
}

/// The polling engine. Owns the active target set and the entertainer
/// pool; the gateway is shared with the pool.
pub struct Reconciler {
    gateway: Arc<dyn Gateway>,
    pool: EntertainerPool,
    targets: Vec<TrackedTarget>,
    pacing: Pacing,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        pool: EntertainerPool,
        targets: Vec<TrackedTarget>,
        pacing: Pacing,
    ) -> Self {
        Self {
            gateway,
            pool,
            targets,
            pacing,
        }
    }

    /// Targets still being watched.
    pub fn targets(&self) -> &[TrackedTarget] {
        &self.targets
    }

    /// Remaining entertainer pool.
    pub fn pool(&self) -> &EntertainerPool {
        &self.pool
    }

    /// Run one full pass over the active targets.
    ///
    /// Lookup failures never fail the cycle; the affected target is
    /// simply retried next cycle. A target whose nickname moved gets
    /// exactly one claim attempt and leaves the set whether or not a
    /// credential was available. Claim-path gateway failures abort the
    /// cycle (and with it the process); they are not retried and do not
    /// restore what they consumed.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let targets = std::mem::take(&mut self.targets);
        let mut retained = Vec::with_capacity(targets.len());

        for mut target in targets {
            let observed = self.observe(&target).await;

            match decide(target.last_nickname(), observed) {
                Step::Record(nickname) => {
                    info!(
                        user_id = %target.user_id(),
                        nickname = %nickname,
                        "nickname recorded"
                    );
                    target.record(nickname);
                    retained.push(target);
                }
                Step::Claim(vacated) => {
                    info!(
                        user_id = %target.user_id(),
                        nickname = %vacated,
                        "nickname moved, claiming vacated name"
                    );
                    // One claim attempt per detected change; the target
                    // leaves the set regardless of the pool's answer.
                    if let Err(e) = self.pool.claim(&vacated).await {
                        if e.is_allocation_failure() {
                            error!(
                                user_id = %target.user_id(),
                                nickname = %vacated,
                                error = %e,
                                "claim abandoned"
                            );
                        } else {
                            return Err(e);
                        }
                    }
                }
                Step::Keep => retained.push(target),
            }

            tokio::time::sleep(self.pacing.target_delay).await;
        }

        self.targets = retained;
        Ok(())
    }

    /// Fetch the target's current nickname, absorbing lookup failures.
    ///
    /// A transient failure cools the loop down before it moves on; the
    /// target is untouched and retried next cycle. An absent user, or a
    /// user with no nickname yet, reads as "nothing observed".
    async fn observe(&self, target: &TrackedTarget) -> Option<String> {
        let snapshot = match self.gateway.lookup_user(target.user_id()).await {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_retriable() => {
                warn!(
                    user_id = %target.user_id(),
                    cooldown_secs = self.pacing.lookup_cooldown.as_secs(),
                    error = %e,
                    "lookup failed, cooling down"
                );
                tokio::time::sleep(self.pacing.lookup_cooldown).await;
                None
            }
            Err(e) => {
                error!(user_id = %target.user_id(), error = %e, "lookup rejected");
                None
            }
        };
        snapshot.and_then(|s| s.nickname).filter(|n| !n.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Secret;
    use gateway::{Session, UserSnapshot};
    use roster::Entertainer;
    use std::collections::{HashMap, VecDeque};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// One scripted lookup result for a user.
    #[derive(Clone, Copy)]
    enum Lookup {
        /// User exists with this nickname
        Nick(&'static str),
        /// User exists but has no nickname yet
        Bare,
        /// User does not exist (404)
        Missing,
        /// Transient lookup failure
        Transient,
    }

    /// Gateway whose lookups are scripted per user id. Scripts are
    /// consumed in order; a user with no remaining script reads as
    /// missing. Records lookup order, sign-ins, and nickname sets.
    struct ScriptedGateway {
        scripts: Mutex<HashMap<String, VecDeque<Lookup>>>,
        lookup_order: Mutex<Vec<String>>,
        signed_in: Mutex<Vec<String>>,
        claims: Mutex<Vec<String>>,
        reject_claims: bool,
    }

    impl ScriptedGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(HashMap::new()),
                lookup_order: Mutex::new(Vec::new()),
                signed_in: Mutex::new(Vec::new()),
                claims: Mutex::new(Vec::new()),
                reject_claims: false,
            })
        }

        fn rejecting_claims() -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(HashMap::new()),
                lookup_order: Mutex::new(Vec::new()),
                signed_in: Mutex::new(Vec::new()),
                claims: Mutex::new(Vec::new()),
                reject_claims: true,
            })
        }

        fn script(&self, user_id: &str, result: Lookup) {
            self.scripts
                .lock()
                .unwrap()
                .entry(user_id.to_string())
                .or_default()
                .push_back(result);
        }
    }

    impl Gateway for ScriptedGateway {
        fn id(&self) -> &str {
            "scripted"
        }

        fn authenticate<'a>(
            &'a self,
            email: &'a str,
            _password: &'a str,
        ) -> Pin<Box<dyn Future<Output = gateway::Result<Session>> + Send + 'a>> {
            Box::pin(async move {
                self.signed_in.lock().unwrap().push(email.to_string());
                Ok(Session {
                    account_id: email.to_string(),
                    token: format!("tok_{email}"),
                })
            })
        }

        fn lookup_user<'a>(
            &'a self,
            user_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = gateway::Result<Option<UserSnapshot>>> + Send + 'a>>
        {
            Box::pin(async move {
                self.lookup_order.lock().unwrap().push(user_id.to_string());
                let next = self
                    .scripts
                    .lock()
                    .unwrap()
                    .get_mut(user_id)
                    .and_then(|queue| queue.pop_front())
                    .unwrap_or(Lookup::Missing);
                match next {
                    Lookup::Nick(nickname) => Ok(Some(UserSnapshot {
                        nickname: Some(nickname.to_string()),
                    })),
                    Lookup::Bare => Ok(Some(UserSnapshot { nickname: None })),
                    Lookup::Missing => Ok(None),
                    Lookup::Transient => {
                        Err(gateway::Error::Lookup("service hiccup".into()))
                    }
                }
            })
        }

        fn set_nickname<'a>(
            &'a self,
            _session: &'a Session,
            nickname: &'a str,
        ) -> Pin<Box<dyn Future<Output = gateway::Result<()>> + Send + 'a>> {
            Box::pin(async move {
                if self.reject_claims {
                    return Err(gateway::Error::NicknameRejected("already taken".into()));
                }
                self.claims.lock().unwrap().push(nickname.to_string());
                Ok(())
            })
        }
    }

    fn target(user_id: &str, last: Option<&str>) -> TrackedTarget {
        TrackedTarget::new(user_id, last.map(String::from))
    }

    fn reconciler(
        gw: Arc<ScriptedGateway>,
        entertainers: &[&str],
        targets: Vec<TrackedTarget>,
    ) -> Reconciler {
        let pool = EntertainerPool::new(
            entertainers
                .iter()
                .map(|email| Entertainer {
                    email: (*email).into(),
                    password: Secret::new("pw".into()),
                })
                .collect(),
            None,
            gw.clone(),
        );
        Reconciler::new(gw, pool, targets, Pacing::default())
    }

    #[test]
    fn decide_records_first_observation() {
        assert_eq!(
            decide(None, Some("Max".into())),
            Step::Record("Max".into())
        );
    }

    #[test]
    fn decide_claims_old_value_on_movement() {
        assert_eq!(
            decide(Some("Max"), Some("NewName".into())),
            Step::Claim("Max".into())
        );
    }

    #[test]
    fn decide_keeps_on_unchanged_or_unobserved() {
        assert_eq!(decide(Some("Max"), Some("Max".into())), Step::Keep);
        assert_eq!(decide(Some("Max"), None), Step::Keep);
        assert_eq!(decide(None, None), Step::Keep);
    }

    #[tokio::test(start_paused = true)]
    async fn first_observation_records_nickname() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("Max"));
        let mut rec = reconciler(gw.clone(), &["a@x.io"], vec![target("u1", None)]);

        rec.run_cycle().await.unwrap();

        assert_eq!(rec.targets(), &[target("u1", Some("Max"))]);
        assert!(gw.claims.lock().unwrap().is_empty(), "recording must not claim");
        assert_eq!(rec.pool().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn changed_nickname_claims_old_value_and_drops_target() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("NewName"));
        let mut rec = reconciler(gw.clone(), &["a@x.io"], vec![target("u1", Some("Max"))]);

        rec.run_cycle().await.unwrap();

        assert!(rec.targets().is_empty(), "claimed target must leave the set");
        // The claim is for the vacated old value, not the new one
        assert_eq!(*gw.claims.lock().unwrap(), vec!["Max"]);
        assert_eq!(*gw.signed_in.lock().unwrap(), vec!["a@x.io"]);
        assert_eq!(rec.pool().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_nickname_is_a_noop() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("Max"));
        let before = vec![target("u1", Some("Max"))];
        let mut rec = reconciler(gw.clone(), &["a@x.io"], before.clone());

        rec.run_cycle().await.unwrap();

        assert_eq!(rec.targets(), &before[..]);
        assert!(gw.claims.lock().unwrap().is_empty());
        assert_eq!(rec.pool().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_pool_abandons_claim_but_still_drops_target() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("NewName"));
        let mut rec = reconciler(gw.clone(), &[], vec![target("u1", Some("Max"))]);

        rec.run_cycle().await.unwrap();

        assert!(rec.targets().is_empty(), "target is dropped even without a credential");
        assert!(gw.claims.lock().unwrap().is_empty());
        assert!(rec.pool().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_lookup_cools_down_and_keeps_target() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Transient);
        let mut rec = reconciler(gw.clone(), &["a@x.io"], vec![target("u1", Some("Max"))]);

        let started = tokio::time::Instant::now();
        rec.run_cycle().await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(rec.targets(), &[target("u1", Some("Max"))]);
        // 10s cooldown plus the 2s inter-target delay
        assert!(
            elapsed >= Duration::from_secs(12),
            "cooldown must be observed, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_user_keeps_target_for_next_cycle() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Missing);
        let mut rec = reconciler(gw.clone(), &["a@x.io"], vec![target("u1", Some("Max"))]);

        rec.run_cycle().await.unwrap();
        assert_eq!(rec.targets(), &[target("u1", Some("Max"))]);

        // Still polled on the following cycle, no dead-letter handling
        rec.run_cycle().await.unwrap();
        assert_eq!(*gw.lookup_order.lock().unwrap(), vec!["u1", "u1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn bare_user_is_not_recorded() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Bare);
        let mut rec = reconciler(gw.clone(), &["a@x.io"], vec![target("u1", None)]);

        rec.run_cycle().await.unwrap();

        assert_eq!(rec.targets(), &[target("u1", None)]);
        assert!(gw.claims.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_active_set_is_a_noop_cycle() {
        let gw = ScriptedGateway::new();
        let mut rec = reconciler(gw.clone(), &["a@x.io"], Vec::new());

        rec.run_cycle().await.unwrap();

        assert!(rec.targets().is_empty());
        assert!(gw.lookup_order.lock().unwrap().is_empty());
        assert_eq!(rec.pool().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn targets_are_processed_in_list_order() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("A"));
        gw.script("u2", Lookup::Nick("C"));
        gw.script("u3", Lookup::Nick("D"));
        let mut rec = reconciler(
            gw.clone(),
            &["a@x.io"],
            vec![
                target("u1", Some("A")),
                target("u2", Some("B")),
                target("u3", None),
            ],
        );

        rec.run_cycle().await.unwrap();

        assert_eq!(*gw.lookup_order.lock().unwrap(), vec!["u1", "u2", "u3"]);
        // u1 unchanged, u2 claimed away, u3 recorded; relative order kept
        assert_eq!(
            rec.targets(),
            &[target("u1", Some("A")), target("u3", Some("D"))]
        );
        assert_eq!(*gw.claims.lock().unwrap(), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_cycle_leaves_state_identical() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("Max"));
        gw.script("u2", Lookup::Missing);
        let before = vec![target("u1", Some("Max")), target("u2", Some("Ana"))];
        let mut rec = reconciler(gw.clone(), &["a@x.io", "b@x.io"], before.clone());

        rec.run_cycle().await.unwrap();

        assert_eq!(rec.targets(), &before[..]);
        assert_eq!(rec.pool().len(), 2);
        assert!(gw.claims.lock().unwrap().is_empty());
        assert!(gw.signed_in.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn inter_target_pacing_is_applied() {
        let gw = ScriptedGateway::new();
        gw.script("u1", Lookup::Nick("A"));
        gw.script("u2", Lookup::Nick("B"));
        gw.script("u3", Lookup::Nick("C"));
        let mut rec = reconciler(
            gw,
            &[],
            vec![
                target("u1", Some("A")),
                target("u2", Some("B")),
                target("u3", Some("C")),
            ],
        );

        let started = tokio::time::Instant::now();
        rec.run_cycle().await.unwrap();
        let elapsed = started.elapsed();

        assert!(
            elapsed >= Duration::from_secs(6),
            "three targets at 2s pacing, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_claim_propagates_and_credential_stays_spent() {
        let gw = ScriptedGateway::rejecting_claims();
        gw.script("u1", Lookup::Nick("NewName"));
        let mut rec = reconciler(gw.clone(), &["a@x.io"], vec![target("u1", Some("Max"))]);

        let err = rec.run_cycle().await.unwrap_err();

        assert!(!err.is_allocation_failure(), "gateway rejection is not an allocation failure");
        // The entertainer signed in and is gone even though the set failed
        assert_eq!(*gw.signed_in.lock().unwrap(), vec!["a@x.io"]);
        assert!(rec.pool().is_empty());
    }
}
