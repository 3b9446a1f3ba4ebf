//! Rules that need more than one signal type.

use cardio_records::{Record, SignalType};

use super::Finding;
use crate::evaluators::oxygen::{HYPOTENSIVE_SYSTOLIC, LOW_SATURATION};
use crate::types::AlertKind;

/// Any low systolic reading together with any low saturation reading.
pub const HYPOTENSIVE_HYPOXEMIA: &str = "Hypotensive Hypoxemia";

/// Fires when the snapshot holds a systolic reading below
/// [`HYPOTENSIVE_SYSTOLIC`] and a saturation reading below
/// [`LOW_SATURATION`], at any times.
///
/// The alert carries the timestamp of the most recent record of any type.
#[must_use]
pub fn evaluate(records: &[Record]) -> Option<Finding> {
    let any_below = |signal: &SignalType, limit: f64| {
        records.iter().any(|r| r.is(signal) && r.value() < limit)
    };

    if !any_below(&SignalType::SystolicPressure, HYPOTENSIVE_SYSTOLIC)
        || !any_below(&SignalType::BloodSaturation, LOW_SATURATION)
    {
        return None;
    }

    let newest = records.last()?;
    Some(Finding::new(
        AlertKind::Combined,
        HYPOTENSIVE_HYPOXEMIA,
        newest.timestamp(),
    ))
}
