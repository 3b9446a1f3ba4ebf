//! Error types for the cardio-alerts crate.

use thiserror::Error;

/// Errors that can occur in the alerting pipeline.
#[derive(Debug, Error)]
pub enum AlertError {
    /// An alert family name that no variant corresponds to.
    #[error("unknown alert family: {family:?}")]
    UnknownFamily {
        /// The family name that was requested.
        family: String,
    },

    /// A repeat policy that cannot be scheduled.
    #[error("invalid repeat policy: {reason}")]
    InvalidPolicy {
        /// Why the policy was rejected.
        reason: String,
    },

    /// Manager configuration failed validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// A sink refused or failed to deliver an alert.
    #[error("delivery to {sink} failed: {reason}")]
    DeliveryFailed {
        /// Name of the sink.
        sink: String,
        /// The reason delivery failed.
        reason: String,
    },

    /// The manager was started outside a Tokio runtime.
    #[error("no tokio runtime available: {reason}")]
    NoRuntime {
        /// Detail from the runtime lookup.
        reason: String,
    },

    /// A background evaluation task panicked or was aborted.
    #[error("evaluation task failed: {reason}")]
    TaskFailed {
        /// The join error description.
        reason: String,
    },

    /// Record parsing or storage failed.
    #[error("record error: {0}")]
    Records(#[from] cardio_records::RecordError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// I/O error while reading configuration or writing alerts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
