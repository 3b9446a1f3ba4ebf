//! Blood oxygen saturation rules.

use cardio_records::{Record, SignalType};

use super::{latest, Finding};
use crate::types::AlertKind;

/// Saturation below this is low (%).
pub const LOW_SATURATION: f64 = 92.0;
/// Systolic pressure below this turns low saturation into hypoxemia (mmHg).
pub const HYPOTENSIVE_SYSTOLIC: f64 = 90.0;
/// Drop in saturation points that counts as rapid.
pub const RAPID_DROP: f64 = 5.0;
/// How far back a rapid drop is looked for (ms).
pub const RAPID_DROP_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Latest saturation below [`LOW_SATURATION`].
pub const SATURATION_TOO_LOW: &str = "Saturation too low";
/// Low saturation while the preceding systolic reading is also low.
pub const HYPOTENSIVE_HYPOXEMIA: &str = "Hypotensive Hypoxemia";
/// Saturation fell by [`RAPID_DROP`] or more inside the window.
pub const DECREASING_TREND: &str = "Decreasing Trend";

/// Runs all saturation rules.
#[must_use]
pub fn evaluate(records: &[Record]) -> Vec<Finding> {
    low_saturation(records)
        .into_iter()
        .chain(rapid_drop(records))
        .collect()
}

/// Checks the latest saturation against [`LOW_SATURATION`].
///
/// When the nearest systolic reading that arrived before it is below
/// [`HYPOTENSIVE_SYSTOLIC`], the condition is reported as hypoxemia instead.
#[must_use]
pub fn low_saturation(records: &[Record]) -> Option<Finding> {
    let (index, reading) = latest(records, &SignalType::BloodSaturation)?;
    if reading.value() >= LOW_SATURATION {
        return None;
    }

    let hypotensive = records[..index]
        .iter()
        .rev()
        .find(|r| r.is(&SignalType::SystolicPressure))
        .is_some_and(|r| r.value() < HYPOTENSIVE_SYSTOLIC);

    let condition = if hypotensive {
        HYPOTENSIVE_HYPOXEMIA
    } else {
        SATURATION_TOO_LOW
    };
    Some(Finding::new(
        AlertKind::BloodOxygen,
        condition,
        reading.timestamp(),
    ))
}

/// Looks back from the latest saturation for an earlier reading inside the
/// window that is at least [`RAPID_DROP`] points higher.
///
/// The alert carries the timestamp of that earlier, higher reading.
#[must_use]
pub fn rapid_drop(records: &[Record]) -> Option<Finding> {
    let (index, reading) = latest(records, &SignalType::BloodSaturation)?;
    let window_start = reading.timestamp().saturating_sub(RAPID_DROP_WINDOW_MS);

    records[..index]
        .iter()
        .rev()
        .filter(|r| r.is(&SignalType::BloodSaturation) && r.timestamp() >= window_start)
        .find(|r| r.value() >= reading.value() + RAPID_DROP)
        .map(|earlier| {
            Finding::new(AlertKind::BloodOxygen, DECREASING_TREND, earlier.timestamp())
        })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{conditions, snapshot};
    use super::*;
    use test_case::test_case;

    const SAT: SignalType = SignalType::BloodSaturation;
    const SYS: SignalType = SignalType::SystolicPressure;

    #[test_case(91.99, true ; "just below limit")]
    #[test_case(92.0, false ; "at limit")]
    #[test_case(97.0, false ; "normal")]
    fn low_saturation_threshold(value: f64, fires: bool) {
        let records = snapshot(&[(SAT, value, 1_000)]);
        assert_eq!(low_saturation(&records).is_some(), fires);
    }

    #[test]
    fn preceding_low_systolic_means_hypoxemia() {
        let records = snapshot(&[(SYS, 85.0, 1_000), (SAT, 90.0, 2_000)]);
        let finding = low_saturation(&records).unwrap();
        assert_eq!(finding.condition, HYPOTENSIVE_HYPOXEMIA);
        assert_eq!(finding.kind, AlertKind::BloodOxygen);
        assert_eq!(finding.timestamp, 2_000);
    }

    #[test]
    fn only_the_nearest_preceding_systolic_counts() {
        let records = snapshot(&[
            (SYS, 85.0, 1_000),
            (SYS, 120.0, 1_500),
            (SAT, 90.0, 2_000),
        ]);
        assert_eq!(
            low_saturation(&records).map(|f| f.condition),
            Some(SATURATION_TOO_LOW)
        );
    }

    #[test]
    fn systolic_arriving_after_saturation_is_ignored() {
        let records = snapshot(&[(SAT, 90.0, 2_000), (SYS, 85.0, 3_000)]);
        assert_eq!(
            low_saturation(&records).map(|f| f.condition),
            Some(SATURATION_TOO_LOW)
        );
    }

    #[test]
    fn rapid_drop_uses_earlier_timestamp() {
        let records = snapshot(&[(SAT, 98.0, 0), (SAT, 92.0, 300_000)]);
        let finding = rapid_drop(&records).unwrap();
        assert_eq!(finding.condition, DECREASING_TREND);
        assert_eq!(finding.timestamp, 0);
    }

    #[test]
    fn drop_outside_window_is_ignored() {
        let records = snapshot(&[(SAT, 98.0, 0), (SAT, 92.0, RAPID_DROP_WINDOW_MS + 1)]);
        assert!(rapid_drop(&records).is_none());
    }

    #[test]
    fn drop_at_window_edge_counts() {
        let records = snapshot(&[(SAT, 98.0, 0), (SAT, 93.0, RAPID_DROP_WINDOW_MS)]);
        assert!(rapid_drop(&records).is_some());
    }

    #[test]
    fn most_recent_qualifying_reading_wins() {
        let records = snapshot(&[
            (SAT, 99.0, 1_000),
            (SAT, 98.0, 2_000),
            (SAT, 93.0, 3_000),
        ]);
        assert_eq!(rapid_drop(&records).map(|f| f.timestamp), Some(2_000));
    }

    #[test_case(98.0, 93.0, true ; "drop of exactly five")]
    #[test_case(97.99, 93.0, false ; "drop just under five")]
    #[test_case(97.0, 93.0, false ; "small drop")]
    fn rapid_drop_boundary(earlier: f64, latest: f64, fires: bool) {
        let records = snapshot(&[(SAT, earlier, 0), (SAT, latest, 60_000)]);
        assert_eq!(rapid_drop(&records).is_some(), fires);
    }

    #[test]
    fn single_reading_has_no_trend() {
        let records = snapshot(&[(SAT, 80.0, 0)]);
        assert_eq!(conditions(&evaluate(&records)), vec![SATURATION_TOO_LOW]);
    }

    #[test]
    fn low_and_dropping_reports_both() {
        let records = snapshot(&[(SAT, 97.0, 0), (SAT, 90.0, 60_000)]);
        assert_eq!(
            conditions(&evaluate(&records)),
            vec![SATURATION_TOO_LOW, DECREASING_TREND]
        );
    }
}
