//! Core types for the record model.
//!
//! - [`SignalType`]: The category of a measurement
//! - [`Record`]: A single immutable measurement for one patient
//! - [`TimeRange`]: An inclusive time window for queries

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecordError, Result};

/// The category of a measurement.
///
/// Labels the engine does not evaluate are kept as [`SignalType::Other`] so
/// the store never loses data it was handed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalType {
    /// Systolic blood pressure (mmHg).
    SystolicPressure,
    /// Diastolic blood pressure (mmHg).
    DiastolicPressure,
    /// Blood oxygen saturation (%).
    BloodSaturation,
    /// Cardiac rhythm sample; only its timestamp matters for rate.
    Ecg,
    /// Nurse or patient call button (1.0 triggered, 0.0 resolved).
    Alert,
    /// Any other label.
    Other(String),
}

impl SignalType {
    /// Returns the canonical wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SystolicPressure => "SystolicPressure",
            Self::DiastolicPressure => "DiastolicPressure",
            Self::BloodSaturation => "BloodSaturation",
            Self::Ecg => "ECG",
            Self::Alert => "Alert",
            Self::Other(label) => label,
        }
    }

    /// Returns true for the two blood pressure signals.
    #[must_use]
    pub const fn is_pressure(&self) -> bool {
        matches!(self, Self::SystolicPressure | Self::DiastolicPressure)
    }
}

impl FromStr for SignalType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "SystolicPressure" => Self::SystolicPressure,
            "DiastolicPressure" => Self::DiastolicPressure,
            "BloodSaturation" | "Saturation" => Self::BloodSaturation,
            "ECG" | "Ecg" => Self::Ecg,
            "Alert" => Self::Alert,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<String> for SignalType {
    fn from(label: String) -> Self {
        match label.parse() {
            Ok(signal) => signal,
            Err(never) => match never {},
        }
    }
}

impl From<SignalType> for String {
    fn from(signal: SignalType) -> Self {
        signal.as_str().to_string()
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single measurement. Fields are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    patient_id: u32,
    signal_type: SignalType,
    value: f64,
    timestamp: i64,
}

impl Record {
    /// Creates a new record.
    #[must_use]
    pub const fn new(patient_id: u32, signal_type: SignalType, value: f64, timestamp: i64) -> Self {
        Self {
            patient_id,
            signal_type,
            value,
            timestamp,
        }
    }

    /// The patient this record belongs to.
    #[must_use]
    pub const fn patient_id(&self) -> u32 {
        self.patient_id
    }

    /// The category of the measurement.
    #[must_use]
    pub const fn signal_type(&self) -> &SignalType {
        &self.signal_type
    }

    /// The measured value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Unix timestamp in milliseconds.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Returns true if this record has the given signal type.
    #[must_use]
    pub fn is(&self, signal_type: &SignalType) -> bool {
        &self.signal_type == signal_type
    }
}

/// An inclusive time window for record queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start timestamp (inclusive), in milliseconds.
    pub start: i64,
    /// End timestamp (inclusive), in milliseconds.
    pub end: i64,
}

impl TimeRange {
    /// Creates a new time range.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidTimeRange` if start > end.
    pub const fn new(start: i64, end: i64) -> Result<Self> {
        if start > end {
            return Err(RecordError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range containing exactly one instant.
    #[must_use]
    pub const fn at(timestamp: i64) -> Self {
        Self {
            start: timestamp,
            end: timestamp,
        }
    }

    /// Returns true if the timestamp falls within this range.
    #[must_use]
    pub const fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}
