//! Eventual-consistency settle poller
//!
//! Some backends acknowledge a write before nested settings are visible on
//! read. [`Settler::wait`] re-fetches the resource until a [`SettleTarget`]
//! classifies the observed state as [`PollOutcome::Updated`] for
//! `debounce` consecutive observations.
//!
//! ```text
//!            fetch ──► classify
//!              ▲          │
//!              │   Pending/Retry ──► reset counter ─┐
//!              │   Updated ──► counter += 1         │
//!              │          │  counter == debounce ──►│──► Ok(())
//!              └── sleep(interval) ◄────────────────┘
//! ```

use crate::client::ResourceClient;
use crate::drift::{Drift, Settle};
use crate::error::{CloudError, Result};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Default minimum interval between two fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of consecutive matching observations
pub const DEFAULT_DEBOUNCE: u32 = 2;

/// Default overall wait, matching the Create/Update operation timeout
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Classification of one observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Backend has not caught up yet
    Pending,
    /// Observed state matches desired state
    Updated,
    /// Fetch failed transiently or returned an incomplete body
    Retry,
    /// Observation cannot be interpreted; aborts the wait
    Error(String),
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Pending => write!(f, "pending"),
            PollOutcome::Updated => write!(f, "updated"),
            PollOutcome::Retry => write!(f, "retry"),
            PollOutcome::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// Timing policy for one settle wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Maximum total wait
    pub timeout: Duration,

    /// Minimum delay between fetches
    pub interval: Duration,

    /// Consecutive `Updated` observations required for success
    pub debounce: u32,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SETTLE_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl SettlePolicy {
    /// Default interval and debounce with the enclosing operation's timeout
    pub fn for_operation(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_debounce(mut self, debounce: u32) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Decides whether an observed model reflects the desired settings
pub trait SettleTarget<M>: Send + Sync {
    /// Settings block name used in logs and errors (e.g. "auto_backup")
    fn name(&self) -> &str;

    fn classify(&self, observed: &M) -> PollOutcome;
}

/// Classify an optional settings block, where `None` means disabled
pub fn classify_block<T: Settle>(desired: Option<&T>, observed: Option<&T>) -> PollOutcome {
    match (desired, observed) {
        (None, None) => PollOutcome::Updated,
        (None, Some(_)) => PollOutcome::Pending,
        (Some(_), None) => PollOutcome::Pending,
        (Some(desired), Some(observed)) => {
            let mut drift = Drift::new();
            desired.compare(observed, &mut drift);
            if drift.is_settled() {
                PollOutcome::Updated
            } else {
                tracing::debug!("drift in {}", drift.fields().join(", "));
                PollOutcome::Pending
            }
        }
    }
}

/// Settle poller bound to one resource client
pub struct Settler<'a, C: ResourceClient> {
    client: &'a C,
    policy: SettlePolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, C: ResourceClient> Settler<'a, C> {
    pub fn new(client: &'a C, policy: SettlePolicy) -> Self {
        Self {
            client,
            policy,
            cancel: None,
        }
    }

    /// Abort waits as soon as `true` is published on `cancel`
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> &SettlePolicy {
        &self.policy
    }

    /// Block until `target` reports `Updated` `debounce` times in a row
    pub async fn wait<T>(&self, id: &C::Id, target: &T) -> Result<()>
    where
        T: SettleTarget<C::Model>,
    {
        let resource = format!("{} of {}", target.name(), id);
        let debounce = self.policy.debounce.max(1);
        let mut cancel = self.cancel.clone();
        let start = Instant::now();
        let mut consecutive = 0u32;
        let mut attempt = 0u32;

        tracing::debug!(
            "Waiting for {} to settle (timeout {:?}, interval {:?}, debounce {})",
            resource,
            self.policy.timeout,
            self.policy.interval,
            debounce
        );

        loop {
            let elapsed = start.elapsed();
            if elapsed >= self.policy.timeout {
                return Err(CloudError::Timeout {
                    resource,
                    waited: elapsed,
                });
            }
            attempt += 1;

            let remaining = self.policy.timeout - elapsed;
            let fetched = match tokio::time::timeout(remaining, self.client.get(id)).await {
                Ok(fetched) => fetched,
                Err(_) => {
                    return Err(CloudError::Timeout {
                        resource,
                        waited: start.elapsed(),
                    });
                }
            };

            let outcome = match fetched {
                Ok(model) => target.classify(&model),
                Err(e) if e.is_transient() => {
                    tracing::warn!("Fetching {} failed, will retry: {}", resource, e);
                    PollOutcome::Retry
                }
                Err(e) => return Err(e),
            };

            tracing::debug!("{} attempt {}: {}", resource, attempt, outcome);

            match outcome {
                PollOutcome::Updated => {
                    consecutive += 1;
                    if consecutive >= debounce {
                        tracing::info!(
                            "{} settled after {} attempts ({:?})",
                            resource,
                            attempt,
                            start.elapsed()
                        );
                        return Ok(());
                    }
                }
                PollOutcome::Pending | PollOutcome::Retry => consecutive = 0,
                PollOutcome::Error(reason) => {
                    return Err(CloudError::SettleFailed { resource, reason });
                }
            }

            let remaining = self.policy.timeout.saturating_sub(start.elapsed());
            let wake_at = Instant::now() + self.policy.interval.min(remaining);
            pause_until(wake_at, cancel.as_mut(), &resource).await?;
        }
    }
}

/// Sleep until `wake_at`, returning early with `Cancelled` if requested
async fn pause_until(
    wake_at: Instant,
    cancel: Option<&mut watch::Receiver<bool>>,
    resource: &str,
) -> Result<()> {
    let Some(cancel) = cancel else {
        sleep_until(wake_at).await;
        return Ok(());
    };

    if *cancel.borrow_and_update() {
        return Err(CloudError::Cancelled(resource.to_string()));
    }

    loop {
        tokio::select! {
            _ = sleep_until(wake_at) => return Ok(()),
            changed = cancel.changed() => match changed {
                Ok(()) => {
                    if *cancel.borrow_and_update() {
                        return Err(CloudError::Cancelled(resource.to_string()));
                    }
                }
                // Sender dropped; nobody can cancel any more
                Err(_) => {
                    sleep_until(wake_at).await;
                    return Ok(());
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq)]
    struct Schedule {
        frequency: String,
        log_minutes: i64,
    }

    impl Settle for Schedule {
        fn compare(&self, observed: &Self, drift: &mut Drift) {
            let Schedule {
                frequency,
                log_minutes,
            } = self;
            drift.case_insensitive("frequency", frequency, &observed.frequency);
            drift.exact("log_minutes", log_minutes, &observed.log_minutes);
        }
    }

    #[derive(Debug, Clone)]
    enum Step {
        Observe(Option<Schedule>),
        Transient,
        NotFound,
    }

    /// Replays scripted observations; the last one repeats forever
    struct ScriptedClient {
        steps: Mutex<VecDeque<Step>>,
        last: Mutex<Option<Step>>,
        fetches: AtomicU32,
    }

    impl ScriptedClient {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                last: Mutex::new(None),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResourceClient for ScriptedClient {
        type Id = String;
        type Model = Option<Schedule>;

        async fn get(&self, id: &String) -> Result<Option<Schedule>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let step = {
                let mut steps = self.steps.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(step) = steps.pop_front() {
                    *last = Some(step.clone());
                    step
                } else {
                    last.clone().expect("script must not be empty")
                }
            };
            match step {
                Step::Observe(observed) => Ok(observed),
                Step::Transient => Err(CloudError::Transient("503 Service Unavailable".into())),
                Step::NotFound => Err(CloudError::ResourceNotFound(id.clone())),
            }
        }

        async fn submit(&self, _id: &String, _model: &Option<Schedule>) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _id: &String) -> Result<()> {
            Ok(())
        }
    }

    struct ScheduleTarget {
        desired: Option<Schedule>,
    }

    impl SettleTarget<Option<Schedule>> for ScheduleTarget {
        fn name(&self) -> &str {
            "manual_schedule"
        }

        fn classify(&self, observed: &Option<Schedule>) -> PollOutcome {
            classify_block(self.desired.as_ref(), observed.as_ref())
        }
    }

    fn weekly(log_minutes: i64) -> Schedule {
        Schedule {
            frequency: "Weekly".to_string(),
            log_minutes,
        }
    }

    fn matching() -> Step {
        Step::Observe(Some(weekly(60)))
    }

    fn drifted() -> Step {
        Step::Observe(Some(weekly(15)))
    }

    fn policy(timeout_minutes: u64) -> SettlePolicy {
        SettlePolicy::for_operation(Duration::from_secs(timeout_minutes * 60))
    }

    fn id() -> String {
        "sqlvm1".to_string()
    }

    #[test]
    fn test_classify_block_presence() {
        let desired = weekly(60);
        assert_eq!(classify_block::<Schedule>(None, None), PollOutcome::Updated);
        assert_eq!(
            classify_block(None, Some(&desired)),
            PollOutcome::Pending
        );
        assert_eq!(
            classify_block(Some(&desired), None),
            PollOutcome::Pending
        );
        assert_eq!(
            classify_block(Some(&desired), Some(&weekly(60))),
            PollOutcome::Updated
        );
        assert_eq!(
            classify_block(Some(&desired), Some(&weekly(5))),
            PollOutcome::Pending
        );
    }

    #[test]
    fn test_policy_defaults() {
        let policy = SettlePolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(60));
        assert_eq!(policy.debounce, 2);
        assert_eq!(policy.timeout, Duration::from_secs(3600));

        let policy = SettlePolicy::for_operation(Duration::from_secs(300)).with_debounce(3);
        assert_eq!(policy.timeout, Duration::from_secs(300));
        assert_eq!(policy.debounce, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_settled_needs_exactly_debounce_fetches() {
        let client = ScriptedClient::new(vec![matching()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };
        let start = Instant::now();

        assert_ok!(Settler::new(&client, policy(60)).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(60));

        // A second wait behaves identically
        assert_ok!(Settler::new(&client, policy(60)).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_on_both_sides_settles() {
        let client = ScriptedClient::new(vec![Step::Observe(None)]);
        let target = ScheduleTarget { desired: None };

        assert_ok!(Settler::new(&client, policy(60)).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_resets_debounce_run() {
        let client = ScriptedClient::new(vec![matching(), drifted(), matching(), matching()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };
        let start = Instant::now();

        assert_ok!(Settler::new(&client, policy(60)).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried() {
        let client = ScriptedClient::new(vec![Step::Transient, matching(), matching()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };

        assert_ok!(Settler::new(&client, policy(60)).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_breaks_debounce_run() {
        let client =
            ScriptedClient::new(vec![matching(), Step::Transient, matching(), matching()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };

        assert_ok!(Settler::new(&client, policy(60)).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_within_one_interval_of_deadline() {
        let client = ScriptedClient::new(vec![drifted()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };
        let start = Instant::now();

        let err = assert_err!(Settler::new(&client, policy(3)).wait(&id(), &target).await);
        let elapsed = start.elapsed();

        assert!(matches!(err, CloudError::Timeout { .. }));
        assert!(elapsed >= Duration::from_secs(180));
        assert!(elapsed <= Duration::from_secs(240));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_fatal_immediately() {
        let client = ScriptedClient::new(vec![drifted(), Step::NotFound]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };
        let start = Instant::now();

        let err = assert_err!(Settler::new(&client, policy(60)).wait(&id(), &target).await);

        assert!(err.is_not_found());
        assert_eq!(client.fetches(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_outcome_aborts() {
        struct Broken;

        impl SettleTarget<Option<Schedule>> for Broken {
            fn name(&self) -> &str {
                "manual_schedule"
            }

            fn classify(&self, _observed: &Option<Schedule>) -> PollOutcome {
                PollOutcome::Error("malformed id".to_string())
            }
        }

        let client = ScriptedClient::new(vec![matching()]);
        let err = assert_err!(Settler::new(&client, policy(60)).wait(&id(), &Broken).await);
        assert!(matches!(err, CloudError::SettleFailed { .. }));
        assert_eq!(client.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_pending_wait() {
        let client = ScriptedClient::new(vec![drifted()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };
        let (tx, rx) = watch::channel(false);
        let settler = Settler::new(&client, policy(60)).with_cancel(rx);
        let start = Instant::now();
        let id = id();

        let (result, _) = tokio::join!(settler.wait(&id, &target), async {
            tokio::time::sleep(Duration::from_secs(90)).await;
            tx.send(true).unwrap();
        });

        let err = assert_err!(result);
        assert!(matches!(err, CloudError::Cancelled(_)));
        assert_eq!(client.fetches(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_debounce_behaves_as_one() {
        let client = ScriptedClient::new(vec![matching()]);
        let target = ScheduleTarget {
            desired: Some(weekly(60)),
        };
        let policy = policy(60).with_debounce(0);

        assert_ok!(Settler::new(&client, policy).wait(&id(), &target).await);
        assert_eq!(client.fetches(), 1);
    }
}
