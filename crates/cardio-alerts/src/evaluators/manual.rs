//! Call button rule.
//!
//! The newest `Alert` record decides the button state: a triggered press
//! raises an alert, a resolved press raises nothing and lets the manager
//! stop repeating earlier presses.

use cardio_records::wire::{CALL_RESOLVED, CALL_TRIGGERED};
use cardio_records::{Record, SignalType};

use super::{latest, Finding};
use crate::types::AlertKind;

/// Raised for a triggered call button.
pub const CALL_BUTTON_TRIGGERED: &str = "Call Button Triggered";

/// State of a patient's call button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallButton {
    /// Pressed and waiting for staff.
    Triggered,
    /// Answered.
    Resolved,
}

/// Returns the button state from the newest call-button record, with its
/// timestamp.
///
/// Values nearer [`CALL_TRIGGERED`] than [`CALL_RESOLVED`] count as
/// triggered.
#[must_use]
pub fn button_state(records: &[Record]) -> Option<(CallButton, i64)> {
    let (_, press) = latest(records, &SignalType::Alert)?;
    let midpoint = (CALL_TRIGGERED + CALL_RESOLVED) / 2.0;
    let state = if press.value() >= midpoint {
        CallButton::Triggered
    } else {
        CallButton::Resolved
    };
    Some((state, press.timestamp()))
}

/// Raises an alert if the button is currently triggered.
#[must_use]
pub fn evaluate(records: &[Record]) -> Option<Finding> {
    match button_state(records)? {
        (CallButton::Triggered, timestamp) => Some(Finding::new(
            AlertKind::Manual,
            CALL_BUTTON_TRIGGERED,
            timestamp,
        )),
        (CallButton::Resolved, _) => None,
    }
}
