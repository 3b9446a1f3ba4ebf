//! Core types for the alerting pipeline.
//!
//! - [`AlertKind`]: The family an alert belongs to
//! - [`Alert`]: An immutable alert produced by an evaluator
//! - [`AlertRecord`]: The capability every alert and decorated alert exposes
//! - [`AlertKey`] / [`ConditionKey`]: Identity used for de-duplication
//! - [`AlertSummary`]: Serializable view handed to sinks

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// The family an alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    /// Systolic or diastolic pressure thresholds and trends.
    BloodPressure,
    /// Saturation thresholds and rapid drops.
    BloodOxygen,
    /// Heart rate derived from ECG timing, plus waveform peaks.
    Ecg,
    /// Alerts that need more than one signal type to decide.
    Combined,
    /// Call button presses.
    Manual,
}

impl AlertKind {
    /// All kinds, in evaluation order.
    pub const ALL: [Self; 5] = [
        Self::BloodPressure,
        Self::BloodOxygen,
        Self::Ecg,
        Self::Combined,
        Self::Manual,
    ];

    /// Returns the family name used in configuration and output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BloodPressure => "BloodPressure",
            Self::BloodOxygen => "BloodOxygen",
            Self::Ecg => "ECG",
            Self::Combined => "Combined",
            Self::Manual => "Manual",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BloodPressure" | "BloodPressureAlert" => Ok(Self::BloodPressure),
            "BloodOxygen" | "BloodOxygenAlert" => Ok(Self::BloodOxygen),
            "ECG" | "Ecg" | "ECGAlert" => Ok(Self::Ecg),
            "Combined" | "CombinedAlert" => Ok(Self::Combined),
            "Manual" | "ManualAlert" => Ok(Self::Manual),
            other => Err(AlertError::UnknownFamily {
                family: other.to_string(),
            }),
        }
    }
}

/// Progress of a repeating alert, as seen by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatStatus {
    /// Firings delivered so far, including the current one.
    pub fired: u32,
    /// Total firings the schedule will make.
    pub max_repeats: u32,
}

/// The capability shared by alerts and decorated alerts.
///
/// Decorators wrap any `AlertRecord` and forward the identity methods, so
/// layers compose in any order. Only `priority` and `repeat` are ever
/// overridden.
pub trait AlertRecord: fmt::Debug + Send + Sync {
    /// The family this alert belongs to.
    fn kind(&self) -> AlertKind;

    /// The patient the alert concerns.
    fn patient_id(&self) -> &str;

    /// Human-readable condition text.
    fn condition(&self) -> &str;

    /// Unix timestamp in milliseconds of the record that caused the alert.
    fn timestamp(&self) -> i64;

    /// Priority attached by a decorator, if any.
    fn priority(&self) -> Option<i32> {
        None
    }

    /// Repeat progress attached by a decorator, if any.
    fn repeat(&self) -> Option<RepeatStatus> {
        None
    }
}

impl<A: AlertRecord + ?Sized> AlertRecord for Box<A> {
    fn kind(&self) -> AlertKind {
        (**self).kind()
    }

    fn patient_id(&self) -> &str {
        (**self).patient_id()
    }

    fn condition(&self) -> &str {
        (**self).condition()
    }

    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    fn priority(&self) -> Option<i32> {
        (**self).priority()
    }

    fn repeat(&self) -> Option<RepeatStatus> {
        (**self).repeat()
    }
}

impl<A: AlertRecord + ?Sized> AlertRecord for Arc<A> {
    fn kind(&self) -> AlertKind {
        (**self).kind()
    }

    fn patient_id(&self) -> &str {
        (**self).patient_id()
    }

    fn condition(&self) -> &str {
        (**self).condition()
    }

    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    fn priority(&self) -> Option<i32> {
        (**self).priority()
    }

    fn repeat(&self) -> Option<RepeatStatus> {
        (**self).repeat()
    }
}

/// An alert raised by an evaluator. Fields are fixed at creation.
///
/// Construct alerts through [`crate::factory::create_alert`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alert {
    kind: AlertKind,
    patient_id: String,
    condition: String,
    timestamp: i64,
}

impl Alert {
    pub(crate) fn new(
        kind: AlertKind,
        patient_id: impl Into<String>,
        condition: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            kind,
            patient_id: patient_id.into(),
            condition: condition.into(),
            timestamp,
        }
    }

    /// The identity used to drop duplicates within one evaluation pass.
    #[must_use]
    pub fn key(&self) -> AlertKey {
        AlertKey::of(self)
    }
}

impl AlertRecord for Alert {
    fn kind(&self) -> AlertKind {
        self.kind
    }

    fn patient_id(&self) -> &str {
        &self.patient_id
    }

    fn condition(&self) -> &str {
        &self.condition
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] patient {}: {} at {}",
            self.kind, self.patient_id, self.condition, self.timestamp
        )
    }
}

/// Full identity of an alert: `(kind, patient, condition, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    /// Alert family.
    pub kind: AlertKind,
    /// Patient identifier.
    pub patient_id: String,
    /// Condition text.
    pub condition: String,
    /// Triggering timestamp.
    pub timestamp: i64,
}

impl AlertKey {
    /// Builds the key for any alert record.
    #[must_use]
    pub fn of(alert: &(impl AlertRecord + ?Sized)) -> Self {
        Self {
            kind: alert.kind(),
            patient_id: alert.patient_id().to_string(),
            condition: alert.condition().to_string(),
            timestamp: alert.timestamp(),
        }
    }

    /// Drops the timestamp, leaving the identity of the ongoing condition.
    #[must_use]
    pub fn condition_key(&self) -> ConditionKey {
        ConditionKey {
            kind: self.kind,
            patient_id: self.patient_id.clone(),
            condition: self.condition.clone(),
        }
    }
}

/// Identity of an ongoing condition: `(kind, patient, condition)`.
///
/// At most one repeat schedule runs per condition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionKey {
    /// Alert family.
    pub kind: AlertKind,
    /// Patient identifier.
    pub patient_id: String,
    /// Condition text.
    pub condition: String,
}

impl ConditionKey {
    /// Builds the condition key for any alert record.
    #[must_use]
    pub fn of(alert: &(impl AlertRecord + ?Sized)) -> Self {
        Self {
            kind: alert.kind(),
            patient_id: alert.patient_id().to_string(),
            condition: alert.condition().to_string(),
        }
    }
}

/// A serializable snapshot of an alert at the moment it was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Alert family.
    pub kind: AlertKind,
    /// Patient identifier.
    pub patient_id: String,
    /// Condition text.
    pub condition: String,
    /// Triggering timestamp in milliseconds.
    pub timestamp: i64,
    /// Priority, when decorated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Repeat progress, when decorated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatStatus>,
    /// Wall-clock delivery time.
    pub delivered_at: DateTime<Utc>,
}

impl AlertSummary {
    /// Captures an alert record, stamping the current time.
    #[must_use]
    pub fn capture(alert: &dyn AlertRecord) -> Self {
        Self {
            kind: alert.kind(),
            patient_id: alert.patient_id().to_string(),
            condition: alert.condition().to_string(),
            timestamp: alert.timestamp(),
            priority: alert.priority(),
            repeat: alert.repeat(),
            delivered_at: Utc::now(),
        }
    }
}
