//! Alert decorators.
//!
//! A decorator wraps any [`AlertRecord`] and exposes the same capability, so
//! layers compose in any order:
//!
//! - [`PriorityAlert`]: attaches a mutable priority
//! - [`RepeatedAlert`]: re-delivers an alert on a fixed interval until a
//!   limit is reached or the schedule is cancelled

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::{AlertError, Result};
use crate::sinks::{deliver_blocking, AlertSink};
use crate::types::{AlertKind, AlertRecord, ConditionKey, RepeatStatus};

/// An alert with a priority attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityAlert<A> {
    inner: A,
    priority: i32,
}

impl<A: AlertRecord> PriorityAlert<A> {
    /// Wraps `inner` with the given priority.
    #[must_use]
    pub const fn new(inner: A, priority: i32) -> Self {
        Self { inner, priority }
    }

    /// Changes the priority. The wrapped alert is untouched.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// The wrapped alert.
    #[must_use]
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    /// Unwraps the alert.
    #[must_use]
    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: AlertRecord> AlertRecord for PriorityAlert<A> {
    fn kind(&self) -> AlertKind {
        self.inner.kind()
    }

    fn patient_id(&self) -> &str {
        self.inner.patient_id()
    }

    fn condition(&self) -> &str {
        self.inner.condition()
    }

    fn timestamp(&self) -> i64 {
        self.inner.timestamp()
    }

    fn priority(&self) -> Option<i32> {
        Some(self.priority)
    }

    fn repeat(&self) -> Option<RepeatStatus> {
        self.inner.repeat()
    }
}

/// How often and how many times an alert is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatPolicy {
    /// Time between firings, in milliseconds.
    pub interval_ms: u64,
    /// Total firings, the first one immediate.
    pub max_repeats: u32,
}

impl RepeatPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidPolicy` for a zero interval or zero
    /// repeat count.
    pub fn new(interval: Duration, max_repeats: u32) -> Result<Self> {
        let policy = Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            max_repeats,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the policy can be scheduled.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidPolicy` for a zero interval or zero
    /// repeat count.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(AlertError::InvalidPolicy {
                reason: "interval must be at least 1ms".to_string(),
            });
        }
        if self.max_repeats == 0 {
            return Err(AlertError::InvalidPolicy {
                reason: "max_repeats must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Time between firings.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// An alert that is delivered repeatedly once scheduled.
#[derive(Debug)]
pub struct RepeatedAlert<A> {
    inner: A,
    policy: RepeatPolicy,
    fired: Arc<AtomicU32>,
}

impl<A: AlertRecord> RepeatedAlert<A> {
    /// Wraps `inner` with a repeat policy. Nothing fires until
    /// [`schedule`](Self::schedule) is called.
    #[must_use]
    pub fn new(inner: A, policy: RepeatPolicy) -> Self {
        Self {
            inner,
            policy,
            fired: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The repeat policy.
    #[must_use]
    pub const fn policy(&self) -> RepeatPolicy {
        self.policy
    }

    /// The wrapped alert.
    #[must_use]
    pub const fn inner(&self) -> &A {
        &self.inner
    }

    /// Firings delivered so far.
    #[must_use]
    pub fn repeats_so_far(&self) -> u32 {
        self.fired.load(Ordering::SeqCst)
    }
}

impl<A: AlertRecord + 'static> RepeatedAlert<A> {
    /// Starts the schedule on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn schedule(self, sink: Arc<dyn AlertSink>) -> RepeatHandle {
        self.schedule_on(sink, &Handle::current())
    }

    /// Starts the schedule on the given runtime.
    ///
    /// The first firing happens immediately, then one per interval until
    /// `max_repeats` firings have been delivered or the returned handle is
    /// cancelled or dropped.
    pub fn schedule_on(self, sink: Arc<dyn AlertSink>, runtime: &Handle) -> RepeatHandle {
        let key = ConditionKey::of(&self.inner);
        let running = Arc::new(AtomicBool::new(true));
        let fired = Arc::clone(&self.fired);
        let max_repeats = self.policy.max_repeats;

        debug!(
            kind = %key.kind,
            patient_id = %key.patient_id,
            condition = %key.condition,
            interval_ms = self.policy.interval_ms,
            max_repeats,
            "scheduling repeated alert"
        );

        let task = runtime.spawn(run_schedule(self, sink, Arc::clone(&running)));

        RepeatHandle {
            key,
            running,
            fired,
            max_repeats,
            task: Some(task),
        }
    }
}

async fn run_schedule<A: AlertRecord + 'static>(
    alert: RepeatedAlert<A>,
    sink: Arc<dyn AlertSink>,
    running: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(alert.policy.interval().max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let alert = Arc::new(alert);

    while running.load(Ordering::SeqCst) && alert.repeats_so_far() < alert.policy.max_repeats {
        ticker.tick().await;

        if !running.load(Ordering::SeqCst) {
            break;
        }

        let firing = alert.fired.fetch_add(1, Ordering::SeqCst) + 1;
        let record: Arc<dyn AlertRecord> = Arc::<RepeatedAlert<A>>::clone(&alert);
        match deliver_blocking(Arc::clone(&sink), record).await {
            Ok(receipt) if receipt.success => {}
            Ok(receipt) => {
                warn!(firing, sink = %receipt.sink, message = ?receipt.message, "repeated alert delivery failed");
            }
            Err(e) => {
                warn!(firing, error = %e, "repeated alert delivery error");
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    debug!(
        condition = %alert.condition(),
        fired = alert.repeats_so_far(),
        "repeat schedule finished"
    );
}

impl<A: AlertRecord> AlertRecord for RepeatedAlert<A> {
    fn kind(&self) -> AlertKind {
        self.inner.kind()
    }

    fn patient_id(&self) -> &str {
        self.inner.patient_id()
    }

    fn condition(&self) -> &str {
        self.inner.condition()
    }

    fn timestamp(&self) -> i64 {
        self.inner.timestamp()
    }

    fn priority(&self) -> Option<i32> {
        self.inner.priority()
    }

    fn repeat(&self) -> Option<RepeatStatus> {
        Some(RepeatStatus {
            fired: self.repeats_so_far(),
            max_repeats: self.policy.max_repeats,
        })
    }
}

/// Handle for a running repeat schedule.
///
/// Dropping the handle cancels the schedule.
#[derive(Debug)]
pub struct RepeatHandle {
    key: ConditionKey,
    running: Arc<AtomicBool>,
    fired: Arc<AtomicU32>,
    max_repeats: u32,
    task: Option<JoinHandle<()>>,
}

impl RepeatHandle {
    /// The condition this schedule repeats.
    #[must_use]
    pub const fn key(&self) -> &ConditionKey {
        &self.key
    }

    /// Firings delivered so far.
    #[must_use]
    pub fn repeats_so_far(&self) -> u32 {
        self.fired.load(Ordering::SeqCst)
    }

    /// Total firings the schedule will make if left alone.
    #[must_use]
    pub const fn max_repeats(&self) -> u32 {
        self.max_repeats
    }

    /// Returns true while more firings may still happen.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.is_finished()
    }

    /// Returns true once the schedule task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the schedule. No firing starts after this returns.
    pub fn cancel(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!(
                patient_id = %self.key.patient_id,
                condition = %self.key.condition,
                fired = self.repeats_so_far(),
                "repeat schedule cancelled"
            );
        }
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Waits for the schedule to end and returns how many firings it made.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::TaskFailed` if the schedule task panicked.
    pub async fn join(mut self) -> Result<u32> {
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    return Err(AlertError::TaskFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(self.repeats_so_far())
    }
}

impl Drop for RepeatHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::create_alert;
    use crate::sinks::MemorySink;
    use crate::types::Alert;

    fn sample() -> Alert {
        create_alert(AlertKind::Manual, "2", "Call Button Triggered", 1_000)
    }

    fn policy(interval_secs: u64, max_repeats: u32) -> RepeatPolicy {
        RepeatPolicy::new(Duration::from_secs(interval_secs), max_repeats).unwrap()
    }

    mod priority_tests {
        use super::*;

        #[test]
        fn attaches_priority_without_changing_identity() {
            let alert = PriorityAlert::new(sample(), 3);
            assert_eq!(alert.priority(), Some(3));
            assert_eq!(alert.kind(), AlertKind::Manual);
            assert_eq!(alert.patient_id(), "2");
            assert_eq!(alert.condition(), "Call Button Triggered");
            assert_eq!(alert.timestamp(), 1_000);
        }

        #[test]
        fn set_priority() {
            let mut alert = PriorityAlert::new(sample(), 1);
            alert.set_priority(9);
            assert_eq!(alert.priority(), Some(9));
            assert_eq!(alert.inner(), &sample());
            assert_eq!(alert.into_inner(), sample());
        }

        #[test]
        fn composes_in_either_order() {
            let outer = PriorityAlert::new(RepeatedAlert::new(sample(), policy(1, 2)), 5);
            assert_eq!(outer.priority(), Some(5));
            assert_eq!(
                outer.repeat(),
                Some(RepeatStatus {
                    fired: 0,
                    max_repeats: 2
                })
            );

            let inner = RepeatedAlert::new(PriorityAlert::new(sample(), 5), policy(1, 2));
            assert_eq!(inner.priority(), Some(5));
            assert_eq!(inner.repeat().map(|r| r.max_repeats), Some(2));
            assert_eq!(inner.condition(), outer.condition());
        }
    }

    mod policy_tests {
        use super::*;

        #[test]
        fn rejects_zero_interval() {
            assert!(matches!(
                RepeatPolicy::new(Duration::ZERO, 3),
                Err(AlertError::InvalidPolicy { .. })
            ));
        }

        #[test]
        fn rejects_zero_repeats() {
            assert!(RepeatPolicy::new(Duration::from_secs(1), 0).is_err());
        }

        #[test]
        fn interval_round_trips() {
            assert_eq!(policy(30, 3).interval(), Duration::from_secs(30));
        }

        #[test]
        fn deserialized_policy_is_validated_separately() {
            let parsed: RepeatPolicy =
                serde_json::from_str(r#"{"interval_ms": 0, "max_repeats": 2}"#).unwrap();
            assert!(parsed.validate().is_err());
        }
    }

    mod schedule_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn fires_exactly_max_repeats() {
            let sink = MemorySink::new();
            let handle = RepeatedAlert::new(sample(), policy(5, 3)).schedule(Arc::new(sink.clone()));

            assert_eq!(handle.max_repeats(), 3);
            let fired = handle.join().await.unwrap();

            assert_eq!(fired, 3);
            let delivered = sink.delivered();
            assert_eq!(delivered.len(), 3);
            let firings: Vec<u32> = delivered
                .iter()
                .filter_map(|s| s.repeat.map(|r| r.fired))
                .collect();
            assert_eq!(firings, vec![1, 2, 3]);
        }

        #[tokio::test(start_paused = true)]
        async fn first_firing_is_immediate() {
            let sink = MemorySink::new();
            let handle = RepeatedAlert::new(sample(), policy(60, 3)).schedule(Arc::new(sink.clone()));

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(sink.len(), 1);
            assert_eq!(handle.repeats_so_far(), 1);
            assert!(handle.is_active());
        }

        #[tokio::test(start_paused = true)]
        async fn cancel_stops_further_firings() {
            let sink = MemorySink::new();
            let handle = RepeatedAlert::new(sample(), policy(5, 10)).schedule(Arc::new(sink.clone()));

            tokio::time::sleep(Duration::from_millis(5_500)).await;
            handle.cancel();
            assert!(!handle.is_active());

            let fired = handle.join().await.unwrap();
            assert_eq!(fired, 2);

            tokio::time::sleep(Duration::from_secs(60)).await;
            assert_eq!(sink.len(), 2);
        }

        #[tokio::test(start_paused = true)]
        async fn dropping_the_handle_cancels() {
            let sink = MemorySink::new();
            let handle = RepeatedAlert::new(sample(), policy(5, 10)).schedule(Arc::new(sink.clone()));

            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(handle);

            tokio::time::sleep(Duration::from_secs(60)).await;
            assert_eq!(sink.len(), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn finished_schedule_reports_finished() {
            let sink = MemorySink::new();
            let handle = RepeatedAlert::new(sample(), policy(1, 1)).schedule(Arc::new(sink.clone()));

            tokio::time::sleep(Duration::from_secs(5)).await;
            assert!(handle.is_finished());
            assert!(!handle.is_active());
            assert_eq!(handle.key().condition, "Call Button Triggered");
        }
    }
}
