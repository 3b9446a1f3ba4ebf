//! Per-patient measurement storage for cardio-watch.
//!
//! `cardio-records` holds the record model the alert evaluators read from:
//! one ordered record sequence per patient, appended as measurements arrive
//! and queried by inclusive time range.
//!
//! # Features
//!
//! - **Idempotent ingestion**: an identical observation at the same timestamp is stored once
//! - **Per-patient locking**: ingestion for one patient never blocks another
//! - **Point-in-time snapshots**: evaluators read a copy that concurrent appends cannot change
//! - **Wire format**: `patientId,timestampMs,signalType,value` lines, from files or any reader
//!
//! # Example
//!
//! ```rust
//! use cardio_records::{PatientStore, SignalType};
//!
//! let store = PatientStore::new();
//! store.append_record(1, SignalType::SystolicPressure, 128.0, 1_700_000_000_000);
//! store.append_record(1, SignalType::BloodSaturation, 97.0, 1_700_000_001_000);
//!
//! let records = store.get_records(1, 1_700_000_000_000, 1_700_000_001_000);
//! assert_eq!(records.len(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/cardio-records/0.1.0")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod reader;
pub mod store;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use error::{RecordError, Result};
pub use reader::{ingest_lines, DirectoryReader, IngestSummary};
pub use store::{Patient, PatientStore};
pub use types::{Record, SignalType, TimeRange};
pub use wire::{format_line, parse_line};
