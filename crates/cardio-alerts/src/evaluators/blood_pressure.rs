//! Blood pressure rules.
//!
//! Systolic readings get absolute thresholds and a step trend. Diastolic
//! readings get their own thresholds and a banded trend that is cancelled as
//! soon as the direction flips.

use cardio_records::{Record, SignalType};

use super::{latest, readings, Finding};
use crate::types::AlertKind;

/// Systolic pressure above this is high (mmHg).
pub const SYSTOLIC_HIGH: f64 = 180.0;
/// Systolic pressure below this is low (mmHg).
pub const SYSTOLIC_LOW: f64 = 90.0;
/// Diastolic pressure above this is high (mmHg).
pub const DIASTOLIC_HIGH: f64 = 120.0;
/// Diastolic pressure below this is low (mmHg).
pub const DIASTOLIC_LOW: f64 = 60.0;
/// Minimum step between consecutive readings that counts toward a trend.
pub const TREND_STEP: f64 = 10.0;
/// Band around the previous reading used by the diastolic trend.
pub const TREND_BAND: f64 = 10.0;
/// Readings a trend rule needs before it can fire.
pub const TREND_MIN_READINGS: usize = 3;

/// Condition raised by the systolic step trend.
pub const TREND: &str = "Trend";
/// Systolic above [`SYSTOLIC_HIGH`].
pub const HIGH_BLOOD_PRESSURE: &str = "High Blood Pressure";
/// Systolic below [`SYSTOLIC_LOW`].
pub const LOW_BLOOD_PRESSURE: &str = "Low Blood Pressure";
/// Diastolic above [`DIASTOLIC_HIGH`].
pub const DIASTOLIC_TOO_HIGH: &str = "Diastolic too high";
/// Diastolic below [`DIASTOLIC_LOW`].
pub const DIASTOLIC_TOO_LOW: &str = "Diastolic too low";
/// Diastolic banded trend, rising.
pub const INCREASING_TREND: &str = "Increasing Trend";
/// Diastolic banded trend, falling.
pub const DECREASING_TREND: &str = "Decreasing Trend";

/// Runs the rules for one pressure signal.
#[must_use]
pub fn evaluate(records: &[Record], signal: &SignalType) -> Vec<Finding> {
    if !signal.is_pressure() {
        return Vec::new();
    }
    let trend = if *signal == SignalType::SystolicPressure {
        step_trend(records, signal)
    } else {
        banded_trend(records, signal)
    };
    threshold(records, signal).into_iter().chain(trend).collect()
}

/// Checks the most recent reading against the absolute limits for `signal`.
#[must_use]
pub fn threshold(records: &[Record], signal: &SignalType) -> Option<Finding> {
    let (high, low, too_high, too_low) = match signal {
        SignalType::SystolicPressure => (
            SYSTOLIC_HIGH,
            SYSTOLIC_LOW,
            HIGH_BLOOD_PRESSURE,
            LOW_BLOOD_PRESSURE,
        ),
        SignalType::DiastolicPressure => (
            DIASTOLIC_HIGH,
            DIASTOLIC_LOW,
            DIASTOLIC_TOO_HIGH,
            DIASTOLIC_TOO_LOW,
        ),
        _ => return None,
    };

    let (_, reading) = latest(records, signal)?;
    let condition = if reading.value() > high {
        too_high
    } else if reading.value() < low {
        too_low
    } else {
        return None;
    };
    Some(Finding::new(
        AlertKind::BloodPressure,
        condition,
        reading.timestamp(),
    ))
}

/// Looks at the three most recent readings `a, b, c` and fires when both
/// `|b - a|` and `|c - b|` exceed [`TREND_STEP`]. Older readings are ignored.
///
/// The alert carries the timestamp of the most recent reading.
#[must_use]
pub fn step_trend(records: &[Record], signal: &SignalType) -> Option<Finding> {
    let values: Vec<&Record> = readings(records, signal).collect();
    let [.., a, b, c] = values.as_slice() else {
        return None;
    };

    let large = |from: &Record, to: &Record| (to.value() - from.value()).abs() > TREND_STEP;
    (large(a, b) && large(b, c))
        .then(|| Finding::new(AlertKind::BloodPressure, TREND, c.timestamp()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Increasing,
    Decreasing,
}

impl Direction {
    const fn condition(self) -> &'static str {
        match self {
            Self::Increasing => INCREASING_TREND,
            Self::Decreasing => DECREASING_TREND,
        }
    }
}

/// Walks backwards from the newest reading, classifying each step against
/// the previous reading widened by [`TREND_BAND`].
///
/// The first step sets a candidate direction. The next step either confirms
/// it, which fires, or contradicts it, which ends the search with nothing.
/// A step that matches neither side also ends the search.
#[must_use]
pub fn banded_trend(records: &[Record], signal: &SignalType) -> Option<Finding> {
    let values: Vec<&Record> = readings(records, signal).collect();
    if values.len() < TREND_MIN_READINGS {
        return None;
    }

    let (newest, earlier) = values.split_last()?;
    let mut measurement = newest.value();
    let mut candidate: Option<Direction> = None;

    for previous in earlier.iter().rev() {
        let reference = previous.value();
        let direction = if measurement < reference + TREND_BAND {
            Direction::Decreasing
        } else if measurement > reference - TREND_BAND {
            Direction::Increasing
        } else {
            return None;
        };

        match candidate {
            None => candidate = Some(direction),
            Some(seen) if seen == direction => {
                return Some(Finding::new(
                    AlertKind::BloodPressure,
                    direction.condition(),
                    newest.timestamp(),
                ));
            }
            Some(_) => return None,
        }
        measurement = reference;
    }

    None
}
