//! Output sinks for alert delivery.
//!
//! This module provides the [`AlertSink`] trait and the sinks shipped with
//! the crate. The manager and repeat schedules deliver through a
//! [`SinkRegistry`], which fans each alert out to every enabled sink.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AlertError, Result};
use crate::types::{AlertRecord, AlertSummary};

/// Result of delivering one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Whether the alert was delivered.
    pub success: bool,
    /// The sink that handled the alert.
    pub sink: String,
    /// Optional message or error description.
    pub message: Option<String>,
}

impl DeliveryReceipt {
    /// Creates a successful receipt.
    #[must_use]
    pub fn success(sink: impl Into<String>) -> Self {
        Self {
            success: true,
            sink: sink.into(),
            message: None,
        }
    }

    /// Creates a failed receipt.
    #[must_use]
    pub fn failure(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            sink: sink.into(),
            message: Some(message.into()),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

/// Trait for alert outputs.
///
/// Implement this trait to route alerts to a display, a pager, or any other
/// destination. `deliver` is synchronous and may do blocking I/O: the
/// dispatcher and repeat schedules call it through [`deliver_blocking`], on
/// Tokio's blocking pool rather than a runtime worker.
pub trait AlertSink: Send + Sync + fmt::Debug {
    /// Returns the name of this sink.
    fn name(&self) -> &str;

    /// Delivers one alert.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::DeliveryFailed` if the alert cannot be delivered.
    fn deliver(&self, alert: &dyn AlertRecord) -> Result<DeliveryReceipt>;

    /// Returns true if this sink is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Runs [`AlertSink::deliver`] on Tokio's blocking pool.
///
/// # Errors
///
/// Returns the sink's error, or `AlertError::TaskFailed` if the sink
/// panicked.
pub async fn deliver_blocking(
    sink: Arc<dyn AlertSink>,
    alert: Arc<dyn AlertRecord>,
) -> Result<DeliveryReceipt> {
    tokio::task::spawn_blocking(move || sink.deliver(alert.as_ref()))
        .await
        .map_err(|e| AlertError::TaskFailed {
            reason: e.to_string(),
        })?
}

/// A sink that writes alerts to the tracing log.
#[derive(Debug, Clone)]
pub struct LogSink {
    name: String,
    enabled: bool,
}

impl LogSink {
    /// Creates a new log sink.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Sets whether the sink is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("log")
    }
}

impl AlertSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, alert: &dyn AlertRecord) -> Result<DeliveryReceipt> {
        let repeat = alert.repeat();
        warn!(
            kind = %alert.kind(),
            patient_id = %alert.patient_id(),
            condition = %alert.condition(),
            timestamp = alert.timestamp(),
            priority = ?alert.priority(),
            firing = repeat.map(|r| r.fired),
            of = repeat.map(|r| r.max_repeats),
            "ALERT"
        );
        Ok(DeliveryReceipt::success(self.name()).with_message("logged to tracing"))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A sink that appends one JSON object per alert to a writer.
///
/// Each line is an [`AlertSummary`].
pub struct JsonLinesSink<W: Write + Send> {
    name: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<File> {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Io` if the file cannot be opened.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!(path = %path.display(), "writing alerts as JSON lines");
        Ok(Self::new(path.display().to_string(), file))
    }
}

impl<W: Write + Send> fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<W: Write + Send> AlertSink for JsonLinesSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, alert: &dyn AlertRecord) -> Result<DeliveryReceipt> {
        let line = serde_json::to_string(&AlertSummary::capture(alert))?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| AlertError::DeliveryFailed {
                sink: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(DeliveryReceipt::success(self.name()))
    }
}

/// A sink that keeps every delivered alert in memory.
///
/// Clones share the same buffer, so a caller can keep one clone and hand
/// the other to the manager.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<AlertSummary>>>,
}

impl MemorySink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything delivered so far, in delivery order.
    #[must_use]
    pub fn delivered(&self) -> Vec<AlertSummary> {
        self.delivered.lock().clone()
    }

    /// Number of alerts delivered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delivered.lock().len()
    }

    /// Returns true if nothing has been delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delivered.lock().is_empty()
    }
}

impl AlertSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn deliver(&self, alert: &dyn AlertRecord) -> Result<DeliveryReceipt> {
        self.delivered.lock().push(AlertSummary::capture(alert));
        Ok(DeliveryReceipt::success(self.name()))
    }
}

/// Fans each alert out to every enabled sink it holds.
///
/// Clones share the same sink list.
#[derive(Debug, Clone, Default)]
pub struct SinkRegistry {
    sinks: Arc<RwLock<Vec<Arc<dyn AlertSink>>>>,
}

impl SinkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn add(&self, sink: Arc<dyn AlertSink>) {
        info!(sink = %sink.name(), "added alert sink");
        self.sinks.write().push(sink);
    }

    /// Number of registered sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.read().len()
    }

    /// Returns true if no sinks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.read().is_empty()
    }
}

impl AlertSink for SinkRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    fn deliver(&self, alert: &dyn AlertRecord) -> Result<DeliveryReceipt> {
        let sinks = self.sinks.read().clone();
        let mut failed = Vec::new();

        for sink in sinks.iter().filter(|s| s.is_enabled()) {
            match sink.deliver(alert) {
                Ok(receipt) if receipt.success => {
                    debug!(sink = %receipt.sink, condition = %alert.condition(), "alert delivered");
                }
                Ok(receipt) => {
                    warn!(sink = %receipt.sink, message = ?receipt.message, "alert delivery failed");
                    failed.push(receipt.sink);
                }
                Err(e) => {
                    warn!(sink = %sink.name(), error = %e, "alert delivery error");
                    failed.push(sink.name().to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(DeliveryReceipt::success(self.name()))
        } else {
            Ok(DeliveryReceipt::failure(
                self.name(),
                format!("failed sinks: {}", failed.join(", ")),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::create_alert;
    use crate::types::AlertKind;

    #[derive(Debug)]
    struct BrokenSink;

    impl AlertSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }

        fn deliver(&self, _alert: &dyn AlertRecord) -> Result<DeliveryReceipt> {
            Err(AlertError::DeliveryFailed {
                sink: "broken".to_string(),
                reason: "unplugged".to_string(),
            })
        }
    }

    fn sample() -> crate::types::Alert {
        create_alert(AlertKind::Ecg, "4", "Heart Rate too high", 9_000)
    }

    mod receipt_tests {
        use super::*;

        #[test]
        fn success_and_failure() {
            let ok = DeliveryReceipt::success("log");
            assert!(ok.success);
            assert!(ok.message.is_none());

            let failed = DeliveryReceipt::failure("pager", "offline");
            assert!(!failed.success);
            assert_eq!(failed.message.as_deref(), Some("offline"));
        }
    }

    mod log_sink_tests {
        use super::*;

        #[test]
        fn default_name() {
            let sink = LogSink::default();
            assert_eq!(sink.name(), "log");
            assert!(sink.is_enabled());
        }

        #[test]
        fn disabled() {
            assert!(!LogSink::new("quiet").enabled(false).is_enabled());
        }

        #[test]
        fn deliver_succeeds() {
            let receipt = LogSink::default().deliver(&sample()).unwrap();
            assert!(receipt.success);
        }
    }

    mod json_lines_tests {
        use super::*;

        #[test]
        fn writes_one_line_per_alert() {
            let sink = JsonLinesSink::new("buffer", Vec::new());
            sink.deliver(&sample()).unwrap();
            sink.deliver(&create_alert(AlertKind::Manual, "4", "Call Button Triggered", 9_500))
                .unwrap();

            let output = String::from_utf8(sink.into_inner()).unwrap();
            let lines: Vec<&str> = output.lines().collect();
            assert_eq!(lines.len(), 2);

            let first: AlertSummary = serde_json::from_str(lines[0]).unwrap();
            assert_eq!(first.kind, AlertKind::Ecg);
            assert_eq!(first.condition, "Heart Rate too high");
            assert_eq!(first.timestamp, 9_000);
        }

        #[test]
        fn append_to_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("alerts.jsonl");

            let sink = JsonLinesSink::append_to(&path).unwrap();
            sink.deliver(&sample()).unwrap();
            drop(sink);

            let sink = JsonLinesSink::append_to(&path).unwrap();
            sink.deliver(&sample()).unwrap();

            let contents = std::fs::read_to_string(&path).unwrap();
            assert_eq!(contents.lines().count(), 2);
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn fans_out_to_every_sink() {
            let registry = SinkRegistry::new();
            let first = MemorySink::new();
            let second = MemorySink::new();
            registry.add(Arc::new(first.clone()));
            registry.add(Arc::new(second.clone()));

            let receipt = registry.deliver(&sample()).unwrap();
            assert!(receipt.success);
            assert_eq!(first.len(), 1);
            assert_eq!(second.len(), 1);
            assert_eq!(registry.len(), 2);
        }

        #[test]
        fn failure_in_one_sink_does_not_stop_others() {
            let registry = SinkRegistry::new();
            let memory = MemorySink::new();
            registry.add(Arc::new(BrokenSink));
            registry.add(Arc::new(memory.clone()));

            let receipt = registry.deliver(&sample()).unwrap();
            assert!(!receipt.success);
            assert!(receipt.message.unwrap().contains("broken"));
            assert_eq!(memory.len(), 1);
        }

        #[test]
        fn disabled_sinks_are_skipped() {
            let registry = SinkRegistry::new();
            registry.add(Arc::new(LogSink::default().enabled(false)));
            assert!(registry.deliver(&sample()).unwrap().success);
        }

        #[test]
        fn clones_share_sinks() {
            let registry = SinkRegistry::new();
            let clone = registry.clone();
            clone.add(Arc::new(MemorySink::new()));
            assert_eq!(registry.len(), 1);
            assert!(!registry.is_empty());
        }
    }

    mod blocking_delivery_tests {
        use super::*;
        use std::thread::{self, ThreadId};

        #[derive(Debug, Default)]
        struct ThreadRecordingSink {
            threads: Mutex<Vec<ThreadId>>,
        }

        impl AlertSink for ThreadRecordingSink {
            fn name(&self) -> &str {
                "threads"
            }

            fn deliver(&self, _alert: &dyn AlertRecord) -> Result<DeliveryReceipt> {
                self.threads.lock().push(thread::current().id());
                Ok(DeliveryReceipt::success("threads"))
            }
        }

        #[tokio::test]
        async fn runs_off_the_runtime_thread() {
            let sink = Arc::new(ThreadRecordingSink::default());
            let receipt = deliver_blocking(sink.clone(), Arc::new(sample())).await.unwrap();
            assert!(receipt.success);

            let threads = sink.threads.lock();
            assert_eq!(threads.len(), 1);
            assert_ne!(threads[0], thread::current().id());
        }

        #[tokio::test]
        async fn sink_errors_pass_through() {
            let err = deliver_blocking(Arc::new(BrokenSink), Arc::new(sample()))
                .await
                .unwrap_err();
            assert!(matches!(err, AlertError::DeliveryFailed { .. }));
        }

        #[tokio::test]
        async fn file_sink_through_blocking_pool() {
            let file = tempfile::NamedTempFile::new().unwrap();
            let sink = Arc::new(JsonLinesSink::append_to(file.path()).unwrap());
            deliver_blocking(sink, Arc::new(sample())).await.unwrap();

            let contents = std::fs::read_to_string(file.path()).unwrap();
            assert_eq!(contents.lines().count(), 1);
            assert!(contents.contains("Heart Rate too high"));
        }
    }
}
