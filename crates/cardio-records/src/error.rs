//! Error types for the cardio-records crate.

use thiserror::Error;

/// Errors that can occur while ingesting or querying patient records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The time range is invalid (start > end).
    #[error("invalid time range: start={start}, end={end}")]
    InvalidTimeRange {
        /// Start timestamp.
        start: i64,
        /// End timestamp.
        end: i64,
    },

    /// A wire line did not have the expected shape.
    #[error("malformed record line: {reason}")]
    MalformedLine {
        /// Why the line was rejected.
        reason: String,
    },

    /// A single field of a wire line could not be parsed.
    #[error("invalid {field}: {value:?}")]
    InvalidField {
        /// The field name.
        field: &'static str,
        /// The raw value that failed to parse.
        value: String,
    },

    /// Reading a data source failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_time_range() {
        let err = RecordError::InvalidTimeRange { start: 100, end: 50 };
        assert_eq!(err.to_string(), "invalid time range: start=100, end=50");
    }

    #[test]
    fn error_display_malformed_line() {
        let err = RecordError::MalformedLine {
            reason: "expected 4 fields, got 3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed record line: expected 4 fields, got 3"
        );
    }

    #[test]
    fn error_display_invalid_field() {
        let err = RecordError::InvalidField {
            field: "patient id",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid patient id: \"abc\"");
    }

    #[test]
    fn error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RecordError = io.into();
        assert!(matches!(err, RecordError::Io(_)));
    }
}
