//! Alert evaluation and delivery for cardio-watch.
//!
//! `cardio-alerts` reads patient records from a
//! [`cardio_records::PatientStore`], runs physiological rules over them and
//! delivers the resulting alerts through pluggable sinks.
//!
//! # Features
//!
//! - **Evaluators**: Blood pressure, saturation, ECG rate and peaks, combined hypotension with hypoxemia, call button
//! - **Decorators**: Attach a priority or a repeat schedule to any alert, in any order
//! - **Non-blocking delivery**: Alerts go to a background task; ingestion never waits on a sink
//! - **Repeat control**: At most one schedule per condition, cancellable per patient
//! - **Sinks**: Tracing log, JSON lines, in-memory, or your own [`AlertSink`]
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use cardio_alerts::{AlertManager, AlertManagerConfig, sinks::MemorySink};
//! use cardio_records::{PatientStore, SignalType};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), cardio_alerts::AlertError> {
//! let store = PatientStore::new();
//! let (manager, dispatcher) = AlertManager::start(store.clone(), AlertManagerConfig::default())?;
//!
//! let sink = MemorySink::new();
//! manager.add_sink(Arc::new(sink.clone()));
//!
//! store.append_record(1, SignalType::SystolicPressure, 190.0, 1_700_000_000_000);
//! let result = manager.process(1);
//! assert_eq!(result.alerts_raised.len(), 1);
//!
//! dispatcher.shutdown().await?;
//! assert_eq!(sink.delivered()[0].condition, "High Blood Pressure");
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/cardio-alerts/0.1.0")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod decorators;
pub mod error;
pub mod evaluators;
pub mod factory;
pub mod manager;
pub mod sinks;
pub mod types;

// Re-export main types at crate root
pub use config::AlertManagerConfig;
pub use decorators::{PriorityAlert, RepeatHandle, RepeatPolicy, RepeatedAlert};
pub use error::{AlertError, Result};
pub use evaluators::{evaluate_all, EvaluatorSet, Finding};
pub use factory::{create_alert, create_alert_for_family, try_create_alert_for_family};
pub use manager::{AlertManager, DeliveryStats, DispatcherHandle, EvaluationResult};
pub use sinks::{
    deliver_blocking, AlertSink, DeliveryReceipt, JsonLinesSink, LogSink, MemorySink, SinkRegistry,
};
pub use types::{Alert, AlertKey, AlertKind, AlertRecord, AlertSummary, ConditionKey, RepeatStatus};
