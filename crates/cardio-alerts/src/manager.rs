//! Alert manager for evaluating patients and delivering alerts.
//!
//! This module provides the [`AlertManager`], the main entry point of the
//! alerting pipeline. It snapshots a patient's records, runs the evaluators,
//! decorates the resulting alerts and hands them to a background delivery
//! task, so ingestion never waits on a sink.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cardio_records::{parse_line, PatientStore, Record};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AlertManagerConfig;
use crate::decorators::{PriorityAlert, RepeatHandle, RepeatedAlert};
use crate::error::{AlertError, Result};
use crate::evaluators::manual::{self, CallButton};
use crate::evaluators::{evaluate_all, Finding};
use crate::sinks::{deliver_blocking, AlertSink, SinkRegistry};
use crate::types::{Alert, AlertKind, AlertRecord, ConditionKey};

/// The result of evaluating one or more patients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Number of patients evaluated.
    pub patients_evaluated: usize,
    /// Alerts raised, after de-duplication, in evaluation order.
    pub alerts_raised: Vec<Alert>,
    /// Alerts dropped because an identical one was already raised in the
    /// same pass.
    pub duplicates_dropped: usize,
    /// Repeat schedules started.
    pub repeats_scheduled: usize,
    /// Alerts delivered once because a schedule for the same condition was
    /// already running.
    pub repeats_suppressed: usize,
    /// Repeat schedules cancelled by a resolved call button.
    pub repeats_cancelled: usize,
    /// Alerts handed to the delivery task.
    pub queued: usize,
}

impl EvaluationResult {
    /// Adds another result's counters and alerts to this one.
    pub fn merge(&mut self, other: Self) {
        self.patients_evaluated += other.patients_evaluated;
        self.alerts_raised.extend(other.alerts_raised);
        self.duplicates_dropped += other.duplicates_dropped;
        self.repeats_scheduled += other.repeats_scheduled;
        self.repeats_suppressed += other.repeats_suppressed;
        self.repeats_cancelled += other.repeats_cancelled;
        self.queued += other.queued;
    }
}

/// Delivery counters kept by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Alerts every sink accepted.
    pub delivered: usize,
    /// Alerts at least one sink failed to take.
    pub failed: usize,
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    delivered: AtomicUsize,
    failed: AtomicUsize,
}

impl DeliveryCounters {
    fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.delivered.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Handle for the background delivery task.
#[derive(Debug)]
pub struct DispatcherHandle {
    shutdown: Arc<Notify>,
    counters: Arc<DeliveryCounters>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Delivery counters so far.
    #[must_use]
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    /// Delivers everything already queued, then stops the task.
    ///
    /// Alerts queued after this is called are dropped.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::TaskFailed` if the delivery task panicked.
    pub async fn shutdown(self) -> Result<DeliveryStats> {
        self.shutdown.notify_one();
        self.task.await.map_err(|e| AlertError::TaskFailed {
            reason: e.to_string(),
        })?;
        let stats = self.counters.snapshot();
        info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "alert dispatcher stopped"
        );
        Ok(stats)
    }
}

type Outbox = mpsc::UnboundedSender<Box<dyn AlertRecord>>;

async fn run_dispatcher(
    mut inbox: mpsc::UnboundedReceiver<Box<dyn AlertRecord>>,
    sinks: Arc<dyn AlertSink>,
    counters: Arc<DeliveryCounters>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            biased;
            next = inbox.recv() => match next {
                Some(alert) => dispatch(&sinks, &counters, alert).await,
                None => break,
            },
            () = shutdown.notified() => {
                inbox.close();
                while let Some(alert) = inbox.recv().await {
                    dispatch(&sinks, &counters, alert).await;
                }
                break;
            }
        }
    }
}

async fn dispatch(
    sinks: &Arc<dyn AlertSink>,
    counters: &DeliveryCounters,
    alert: Box<dyn AlertRecord>,
) {
    let ok = match deliver_blocking(Arc::clone(sinks), Arc::from(alert)).await {
        Ok(receipt) => receipt.success,
        Err(e) => {
            warn!(error = %e, "alert delivery error");
            false
        }
    };
    let counter = if ok {
        &counters.delivered
    } else {
        &counters.failed
    };
    counter.fetch_add(1, Ordering::SeqCst);
}

/// The alert manager turns patient records into delivered alerts.
///
/// It handles the whole pipeline:
/// - Snapshotting a patient's records and running the evaluators
/// - Dropping duplicate alerts within a pass
/// - Applying the configured priority and repeat decorations
/// - Queueing alerts for the delivery task, or starting repeat schedules
///
/// Clones share the same sinks, repeat schedules and delivery queue.
#[derive(Debug, Clone)]
pub struct AlertManager {
    config: AlertManagerConfig,
    store: PatientStore,
    sinks: SinkRegistry,
    outbox: Outbox,
    repeats: Arc<Mutex<HashMap<ConditionKey, RepeatHandle>>>,
    runtime: Handle,
}

impl AlertManager {
    /// Creates a manager and starts its delivery task on the current Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the configuration is invalid
    /// and `AlertError::NoRuntime` outside a Tokio runtime.
    pub fn start(store: PatientStore, config: AlertManagerConfig) -> Result<(Self, DispatcherHandle)> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| AlertError::NoRuntime {
            reason: e.to_string(),
        })?;

        let sinks = SinkRegistry::new();
        let counters = Arc::new(DeliveryCounters::default());
        let shutdown = Arc::new(Notify::new());
        let (outbox, inbox) = mpsc::unbounded_channel();

        let fan_out: Arc<dyn AlertSink> = Arc::new(sinks.clone());
        let task = runtime.spawn(run_dispatcher(
            inbox,
            fan_out,
            Arc::clone(&counters),
            Arc::clone(&shutdown),
        ));

        info!(
            priority = ?config.priority,
            repeat = ?config.repeat,
            "alert manager started"
        );

        let manager = Self {
            config,
            store,
            sinks,
            outbox,
            repeats: Arc::new(Mutex::new(HashMap::new())),
            runtime,
        };
        let dispatcher = DispatcherHandle {
            shutdown,
            counters,
            task,
        };
        Ok((manager, dispatcher))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AlertManagerConfig {
        &self.config
    }

    /// Returns the record store.
    #[must_use]
    pub const fn store(&self) -> &PatientStore {
        &self.store
    }

    // ============ Sink Management ============

    /// Adds an output sink.
    pub fn add_sink(&self, sink: Arc<dyn AlertSink>) {
        self.sinks.add(sink);
    }

    /// Returns the number of sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    // ============ Evaluation ============

    /// Evaluates one patient's current records without delivering anything.
    ///
    /// Evaluating the same snapshot twice gives the same alerts.
    #[must_use]
    pub fn evaluate(&self, patient_id: u32) -> Vec<Alert> {
        let records = self.store.snapshot(patient_id);
        let findings = evaluate_all(&records, &self.config.evaluators);
        dedupe(patient_id, findings).0
    }

    /// Evaluates one patient and sends the resulting alerts on their way.
    ///
    /// Never blocks on a sink.
    pub fn process(&self, patient_id: u32) -> EvaluationResult {
        let records = self.store.snapshot(patient_id);
        let findings = evaluate_all(&records, &self.config.evaluators);
        let mut result = self.raise(patient_id, findings);

        if self.config.evaluators.manual
            && matches!(manual::button_state(&records), Some((CallButton::Resolved, _)))
        {
            let patient = patient_id.to_string();
            result.repeats_cancelled +=
                self.cancel_where(|key| key.kind == AlertKind::Manual && key.patient_id == patient);
        }

        debug!(
            patient_id,
            records = records.len(),
            alerts = result.alerts_raised.len(),
            duplicates = result.duplicates_dropped,
            "patient evaluated"
        );
        result
    }

    /// Stores a record and, if it was new, processes its patient.
    pub fn ingest(&self, record: Record) -> EvaluationResult {
        let patient_id = record.patient_id();
        if self.store.append(record) {
            self.process(patient_id)
        } else {
            EvaluationResult::default()
        }
    }

    /// Parses a wire line, stores it and processes its patient.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Records` if the line does not parse.
    pub fn ingest_line(&self, line: &str) -> Result<EvaluationResult> {
        let record = parse_line(line)?;
        Ok(self.ingest(record))
    }

    /// Processes every known patient in parallel on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::TaskFailed` if an evaluation task panicked.
    pub async fn process_all(&self) -> Result<EvaluationResult> {
        let tasks = self.store.patient_ids().into_iter().map(|patient_id| {
            let manager = self.clone();
            self.runtime
                .spawn_blocking(move || manager.process(patient_id))
        });

        let mut total = EvaluationResult::default();
        for joined in futures::future::join_all(tasks).await {
            let result = joined.map_err(|e| AlertError::TaskFailed {
                reason: e.to_string(),
            })?;
            total.merge(result);
        }

        info!(
            patients = total.patients_evaluated,
            alerts = total.alerts_raised.len(),
            repeats_scheduled = total.repeats_scheduled,
            "evaluation complete"
        );
        Ok(total)
    }

    fn raise(&self, patient_id: u32, findings: Vec<Finding>) -> EvaluationResult {
        let (alerts, duplicates_dropped) = dedupe(patient_id, findings);
        let mut result = EvaluationResult {
            patients_evaluated: 1,
            duplicates_dropped,
            ..EvaluationResult::default()
        };

        for alert in &alerts {
            info!(
                kind = %alert.kind(),
                patient_id = %alert.patient_id(),
                condition = %alert.condition(),
                timestamp = alert.timestamp(),
                "alert raised"
            );
            self.send(alert.clone(), &mut result);
        }
        result.alerts_raised = alerts;
        result
    }

    fn send(&self, alert: Alert, result: &mut EvaluationResult) {
        let decorated: Box<dyn AlertRecord> = match self.config.priority {
            Some(priority) => Box::new(PriorityAlert::new(alert, priority)),
            None => Box::new(alert),
        };

        let Some(policy) = self.config.repeat else {
            self.enqueue(decorated, result);
            return;
        };

        let key = ConditionKey::of(&decorated);
        let mut repeats = self.repeats.lock();
        repeats.retain(|_, handle| handle.is_active());

        if repeats.contains_key(&key) {
            drop(repeats);
            debug!(condition = %key.condition, "repeat already running; delivering once");
            result.repeats_suppressed += 1;
            self.enqueue(decorated, result);
            return;
        }

        let sink: Arc<dyn AlertSink> = Arc::new(self.sinks.clone());
        let handle = RepeatedAlert::new(decorated, policy).schedule_on(sink, &self.runtime);
        repeats.insert(key, handle);
        result.repeats_scheduled += 1;
    }

    fn enqueue(&self, alert: Box<dyn AlertRecord>, result: &mut EvaluationResult) {
        if self.outbox.send(alert).is_ok() {
            result.queued += 1;
        } else {
            warn!("delivery task has stopped; dropping alert");
        }
    }

    // ============ Repeat Management ============

    /// Number of repeat schedules still firing.
    #[must_use]
    pub fn active_repeats(&self) -> usize {
        self.repeats.lock().values().filter(|h| h.is_active()).count()
    }

    /// Cancels every repeat schedule for a patient.
    ///
    /// Returns the number of schedules that were still active.
    pub fn cancel_repeats(&self, patient_id: u32) -> usize {
        let patient = patient_id.to_string();
        let cancelled = self.cancel_where(|key| key.patient_id == patient);
        if cancelled > 0 {
            info!(patient_id, cancelled, "cancelled repeat schedules");
        }
        cancelled
    }

    /// Cancels every repeat schedule.
    pub fn cancel_all_repeats(&self) -> usize {
        self.cancel_where(|_| true)
    }

    fn cancel_where(&self, matches: impl Fn(&ConditionKey) -> bool) -> usize {
        let mut repeats = self.repeats.lock();
        let keys: Vec<ConditionKey> = repeats.keys().filter(|k| matches(k)).cloned().collect();

        let mut cancelled = 0;
        for key in keys {
            if let Some(handle) = repeats.remove(&key) {
                if handle.is_active() {
                    cancelled += 1;
                }
                handle.cancel();
            }
        }
        cancelled
    }

    /// Waits for every repeat schedule to run to completion.
    ///
    /// Returns the total number of firings the schedules made.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::TaskFailed` if a schedule task panicked.
    pub async fn finish_repeats(&self) -> Result<u32> {
        let handles: Vec<RepeatHandle> = self.repeats.lock().drain().map(|(_, h)| h).collect();
        let mut fired = 0;
        for handle in handles {
            fired += handle.join().await?;
        }
        Ok(fired)
    }
}

fn dedupe(patient_id: u32, findings: Vec<Finding>) -> (Vec<Alert>, usize) {
    let patient = patient_id.to_string();
    let mut seen = HashSet::new();
    let mut alerts = Vec::with_capacity(findings.len());
    let mut duplicates = 0;

    for finding in findings {
        let alert = finding.into_alert(patient.as_str());
        if seen.insert(alert.key()) {
            alerts.push(alert);
        } else {
            duplicates += 1;
        }
    }
    (alerts, duplicates)
}
