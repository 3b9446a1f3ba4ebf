//! The single construction point for alerts.
//!
//! Evaluators never build [`Alert`] values directly; they describe a finding
//! and the factory turns it into the variant for its family.

use crate::error::Result;
use crate::types::{Alert, AlertKind};

/// Creates an alert of the given kind.
#[must_use]
pub fn create_alert(
    kind: AlertKind,
    patient_id: impl Into<String>,
    condition: impl Into<String>,
    timestamp: i64,
) -> Alert {
    Alert::new(kind, patient_id, condition, timestamp)
}

/// Creates an alert from a family name such as `"BloodPressure"`.
///
/// # Errors
///
/// Returns `AlertError::UnknownFamily` if no variant has that name.
pub fn try_create_alert_for_family(
    family: &str,
    patient_id: impl Into<String>,
    condition: impl Into<String>,
    timestamp: i64,
) -> Result<Alert> {
    let kind = family.parse::<AlertKind>()?;
    Ok(create_alert(kind, patient_id, condition, timestamp))
}

/// Creates an alert from a family name, panicking on an unknown family.
///
/// An unknown family here is a wiring bug between an evaluator and the
/// factory, never a data problem.
///
/// # Panics
///
/// Panics if `family` names no alert variant.
#[must_use]
#[allow(clippy::panic)]
pub fn create_alert_for_family(
    family: &str,
    patient_id: impl Into<String>,
    condition: impl Into<String>,
    timestamp: i64,
) -> Alert {
    match try_create_alert_for_family(family, patient_id, condition, timestamp) {
        Ok(alert) => alert,
        Err(e) => panic!("{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlertRecord;
    use test_case::test_case;

    #[test_case(AlertKind::BloodPressure ; "blood pressure")]
    #[test_case(AlertKind::BloodOxygen ; "blood oxygen")]
    #[test_case(AlertKind::Ecg ; "ecg")]
    #[test_case(AlertKind::Combined ; "combined")]
    #[test_case(AlertKind::Manual ; "manual")]
    fn create_alert_keeps_fields(kind: AlertKind) {
        let alert = create_alert(kind, "3", "Heart Rate too high", 42);
        assert_eq!(alert.kind(), kind);
        assert_eq!(alert.patient_id(), "3");
        assert_eq!(alert.condition(), "Heart Rate too high");
        assert_eq!(alert.timestamp(), 42);
    }

    #[test]
    fn family_name_selects_variant() {
        let alert = create_alert_for_family("BloodOxygen", "1", "Saturation too low", 10);
        assert_eq!(alert.kind(), AlertKind::BloodOxygen);
    }

    #[test]
    fn try_create_reports_unknown_family() {
        assert!(try_create_alert_for_family("Cholesterol", "1", "x", 0).is_err());
    }

    #[test]
    #[should_panic(expected = "unknown alert family")]
    fn unknown_family_panics() {
        let _ = create_alert_for_family("Cholesterol", "1", "x", 0);
    }
}
