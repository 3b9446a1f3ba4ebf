//! Signal evaluators.
//!
//! Each evaluator is a pure function over one patient's record snapshot, in
//! arrival order. It returns [`Finding`]s; turning findings into alerts,
//! de-duplicating them and delivering them is the manager's job.
//!
//! Rules that need more history than the snapshot holds simply find nothing.

pub mod blood_pressure;
pub mod combined;
pub mod ecg;
pub mod manual;
pub mod oxygen;

use cardio_records::{Record, SignalType};
use serde::{Deserialize, Serialize};

use crate::factory::create_alert;
use crate::types::{Alert, AlertKind};

/// A rule that matched, before it becomes an [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    /// Family of the alert to raise.
    pub kind: AlertKind,
    /// Condition text.
    pub condition: &'static str,
    /// Timestamp of the record the rule attributes the alert to.
    pub timestamp: i64,
}

impl Finding {
    /// Creates a new finding.
    #[must_use]
    pub const fn new(kind: AlertKind, condition: &'static str, timestamp: i64) -> Self {
        Self {
            kind,
            condition,
            timestamp,
        }
    }

    /// Turns the finding into an alert for the given patient.
    #[must_use]
    pub fn into_alert(self, patient_id: impl Into<String>) -> Alert {
        create_alert(self.kind, patient_id, self.condition, self.timestamp)
    }
}

/// Which evaluator families run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSet {
    /// Systolic and diastolic rules.
    pub blood_pressure: bool,
    /// Saturation rules.
    pub blood_oxygen: bool,
    /// Heart rate and peak rules.
    pub ecg: bool,
    /// Hypotension with hypoxemia over the whole snapshot.
    pub combined: bool,
    /// Call button.
    pub manual: bool,
}

impl Default for EvaluatorSet {
    fn default() -> Self {
        Self {
            blood_pressure: true,
            blood_oxygen: true,
            ecg: true,
            combined: true,
            manual: true,
        }
    }
}

impl EvaluatorSet {
    /// Returns true if the family for `kind` is enabled.
    #[must_use]
    pub const fn is_enabled(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::BloodPressure => self.blood_pressure,
            AlertKind::BloodOxygen => self.blood_oxygen,
            AlertKind::Ecg => self.ecg,
            AlertKind::Combined => self.combined,
            AlertKind::Manual => self.manual,
        }
    }
}

/// Runs every enabled evaluator that applies to the signal types present.
///
/// Findings come back in a stable order: blood pressure (systolic, then
/// diastolic), oxygen, ECG, combined, manual.
#[must_use]
pub fn evaluate_all(records: &[Record], enabled: &EvaluatorSet) -> Vec<Finding> {
    let mut findings = Vec::new();
    let has = |signal: &SignalType| records.iter().any(|r| r.is(signal));

    if enabled.blood_pressure {
        for signal in [SignalType::SystolicPressure, SignalType::DiastolicPressure] {
            if has(&signal) {
                findings.extend(blood_pressure::evaluate(records, &signal));
            }
        }
    }
    if enabled.blood_oxygen && has(&SignalType::BloodSaturation) {
        findings.extend(oxygen::evaluate(records));
    }
    if enabled.ecg && has(&SignalType::Ecg) {
        findings.extend(ecg::evaluate(records));
    }
    if enabled.combined {
        findings.extend(combined::evaluate(records));
    }
    if enabled.manual && has(&SignalType::Alert) {
        findings.extend(manual::evaluate(records));
    }

    findings
}

/// Records of one signal type, in arrival order.
pub(crate) fn readings<'a>(
    records: &'a [Record],
    signal: &'a SignalType,
) -> impl DoubleEndedIterator<Item = &'a Record> + 'a {
    records.iter().filter(move |r| r.is(signal))
}

/// Position and value of the most recently arrived record of one type.
pub(crate) fn latest<'a>(records: &'a [Record], signal: &SignalType) -> Option<(usize, &'a Record)> {
    records.iter().enumerate().rev().find(|(_, r)| r.is(signal))
}

#[cfg(test)]
pub(crate) mod test_support {
    use cardio_records::{Record, SignalType};

    /// Builds a snapshot for patient 1 from `(type, value, timestamp)` triples.
    pub fn snapshot(entries: &[(SignalType, f64, i64)]) -> Vec<Record> {
        entries
            .iter()
            .map(|(signal, value, ts)| Record::new(1, signal.clone(), *value, *ts))
            .collect()
    }

    pub fn series(signal: &SignalType, values: &[f64]) -> Vec<Record> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Record::new(1, signal.clone(), *v, (i as i64 + 1) * 1_000))
            .collect()
    }

    pub fn conditions(findings: &[super::Finding]) -> Vec<&'static str> {
        findings.iter().map(|f| f.condition).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn empty_snapshot_finds_nothing() {
        assert!(evaluate_all(&[], &EvaluatorSet::default()).is_empty());
    }

    #[test]
    fn single_normal_reading_finds_nothing() {
        let records = snapshot(&[(SignalType::SystolicPressure, 120.0, 1_000)]);
        assert!(evaluate_all(&records, &EvaluatorSet::default()).is_empty());
    }

    #[test]
    fn unknown_signal_types_are_ignored() {
        let records = snapshot(&[(SignalType::Other("Cholesterol".into()), 500.0, 1_000)]);
        assert!(evaluate_all(&records, &EvaluatorSet::default()).is_empty());
    }

    #[test]
    fn disabled_family_is_skipped() {
        let records = snapshot(&[(SignalType::SystolicPressure, 200.0, 1_000)]);
        let enabled = EvaluatorSet {
            blood_pressure: false,
            ..EvaluatorSet::default()
        };
        assert!(evaluate_all(&records, &enabled).is_empty());
        assert!(!enabled.is_enabled(AlertKind::BloodPressure));
        assert!(enabled.is_enabled(AlertKind::Ecg));
    }

    #[test]
    fn families_report_in_stable_order() {
        let records = snapshot(&[
            (SignalType::Alert, 1.0, 500),
            (SignalType::BloodSaturation, 85.0, 1_000),
            (SignalType::DiastolicPressure, 130.0, 1_500),
            (SignalType::SystolicPressure, 85.0, 2_000),
        ]);
        let findings = evaluate_all(&records, &EvaluatorSet::default());
        let kinds: Vec<AlertKind> = findings.iter().map(|f| f.kind).collect();

        assert_eq!(
            kinds,
            vec![
                AlertKind::BloodPressure,
                AlertKind::BloodPressure,
                AlertKind::BloodOxygen,
                AlertKind::Combined,
                AlertKind::Manual,
            ]
        );
        assert_eq!(
            conditions(&findings),
            vec![
                "Low Blood Pressure",
                "Diastolic too high",
                "Saturation too low",
                "Hypotensive Hypoxemia",
                "Call Button Triggered",
            ]
        );
    }

    #[test]
    fn finding_into_alert() {
        let alert = Finding::new(AlertKind::Ecg, "Abnormal ECG Peak", 77).into_alert("9");
        assert_eq!(alert.key().patient_id, "9");
        assert_eq!(alert.key().timestamp, 77);
    }

    #[test]
    fn evaluator_set_deserializes_partially() {
        let set: EvaluatorSet = serde_json::from_str(r#"{"ecg": false}"#).unwrap();
        assert!(!set.ecg);
        assert!(set.blood_pressure);
    }
}
