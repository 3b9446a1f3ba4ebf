//! Heart rate rules derived from ECG timing, plus waveform peaks.
//!
//! Rate comes from the gap between consecutive ECG records:
//! `60000 / |Δt|` beats per minute. Pairs sharing a timestamp carry no rate
//! and are skipped.

use cardio_records::{Record, SignalType};

use super::{readings, Finding};
use crate::types::AlertKind;

/// Heart rate below this is low (bpm).
pub const LOW_RATE_BPM: f64 = 50.0;
/// Heart rate above this is high (bpm).
pub const HIGH_RATE_BPM: f64 = 100.0;
/// Change between successive rates that counts as irregular (bpm).
pub const IRREGULAR_CHANGE_BPM: f64 = 10.0;
/// Irregularity score at which the trend rule fires.
pub const IRREGULAR_SCORE: u32 = 5;
/// ECG sample value above which a peak is abnormal.
pub const PEAK_THRESHOLD: f64 = 150.0;

/// Latest rate below [`LOW_RATE_BPM`].
pub const HEART_RATE_TOO_LOW: &str = "Heart Rate too low";
/// Latest rate above [`HIGH_RATE_BPM`].
pub const HEART_RATE_TOO_HIGH: &str = "Heart Rate too high";
/// Rates keep jumping by [`IRREGULAR_CHANGE_BPM`] or more.
pub const ABNORMAL_TREND: &str = "Abnormal Heart Rate Trend";
/// A sample above [`PEAK_THRESHOLD`].
pub const ABNORMAL_PEAK: &str = "Abnormal ECG Peak";

/// Converts the gap between two ECG records into beats per minute.
///
/// Returns `None` when the timestamps are equal.
#[must_use]
pub fn heart_rate(earlier: i64, later: i64) -> Option<f64> {
    let gap = later.abs_diff(earlier);
    (gap != 0).then(|| 60_000.0 / gap as f64)
}

/// Runs all ECG rules.
#[must_use]
pub fn evaluate(records: &[Record]) -> Vec<Finding> {
    [rate_threshold(records), irregular_trend(records), peak(records)]
        .into_iter()
        .flatten()
        .collect()
}

/// Checks the rate between the two most recent ECG records.
#[must_use]
pub fn rate_threshold(records: &[Record]) -> Option<Finding> {
    let beats: Vec<&Record> = readings(records, &SignalType::Ecg).collect();
    let [.., previous, newest] = beats.as_slice() else {
        return None;
    };

    let rate = heart_rate(previous.timestamp(), newest.timestamp())?;
    let condition = if rate < LOW_RATE_BPM {
        HEART_RATE_TOO_LOW
    } else if rate > HIGH_RATE_BPM {
        HEART_RATE_TOO_HIGH
    } else {
        return None;
    };
    Some(Finding::new(AlertKind::Ecg, condition, newest.timestamp()))
}

/// Scores successive rates, newest first: a jump of at least
/// [`IRREGULAR_CHANGE_BPM`] adds one, anything smaller takes one away (never
/// below zero). Reaching [`IRREGULAR_SCORE`] fires.
///
/// The alert carries the timestamp of the earlier record of the most recent
/// pair.
#[must_use]
pub fn irregular_trend(records: &[Record]) -> Option<Finding> {
    let beats: Vec<&Record> = readings(records, &SignalType::Ecg).collect();
    let [.., opener, _] = beats.as_slice() else {
        return None;
    };

    let mut score = 0_u32;
    let mut last_rate: Option<f64> = None;

    for pair in beats.windows(2).rev() {
        let Some(rate) = heart_rate(pair[0].timestamp(), pair[1].timestamp()) else {
            continue;
        };
        if let Some(previous) = last_rate {
            if (previous - rate).abs() >= IRREGULAR_CHANGE_BPM {
                score += 1;
            } else {
                score = score.saturating_sub(1);
            }
            if score >= IRREGULAR_SCORE {
                return Some(Finding::new(
                    AlertKind::Ecg,
                    ABNORMAL_TREND,
                    opener.timestamp(),
                ));
            }
        }
        last_rate = Some(rate);
    }

    None
}

/// Reports the most recent ECG sample above [`PEAK_THRESHOLD`].
#[must_use]
pub fn peak(records: &[Record]) -> Option<Finding> {
    readings(records, &SignalType::Ecg)
        .rev()
        .find(|r| r.value() > PEAK_THRESHOLD)
        .map(|r| Finding::new(AlertKind::Ecg, ABNORMAL_PEAK, r.timestamp()))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::conditions;
    use super::*;
    use test_case::test_case;

    fn beats_at(timestamps: &[i64]) -> Vec<Record> {
        timestamps
            .iter()
            .map(|ts| Record::new(1, SignalType::Ecg, 0.5, *ts))
            .collect()
    }

    #[test_case(0, 1_000, Some(60.0) ; "one second")]
    #[test_case(1_000, 0, Some(60.0) ; "reversed order")]
    #[test_case(0, 500, Some(120.0) ; "half second")]
    #[test_case(7, 7, None ; "same timestamp")]
    fn rate_from_gap(earlier: i64, later: i64, expected: Option<f64>) {
        assert_eq!(heart_rate(earlier, later), expected);
    }

    mod rate_threshold_tests {
        use super::*;
        use test_case::test_case;

        #[test]
        fn slow_rate() {
            let records = beats_at(&[0, 1_000, 2_500]);
            let finding = rate_threshold(&records).unwrap();
            assert_eq!(finding.condition, HEART_RATE_TOO_LOW);
            assert_eq!(finding.timestamp, 2_500);
        }

        #[test]
        fn fast_rate() {
            let records = beats_at(&[0, 500]);
            assert_eq!(
                rate_threshold(&records).map(|f| f.condition),
                Some(HEART_RATE_TOO_HIGH)
            );
        }

        #[test_case(800, None ; "75 bpm")]
        #[test_case(1_000, None ; "60 bpm")]
        #[test_case(2_000, Some(HEART_RATE_TOO_LOW) ; "30 bpm")]
        #[test_case(1_200, None ; "50 bpm is not low")]
        #[test_case(600, None ; "100 bpm is not high")]
        fn rate_boundaries(gap: i64, expected: Option<&str>) {
            let records = beats_at(&[0, gap]);
            assert_eq!(rate_threshold(&records).map(|f| f.condition), expected);
        }

        #[test]
        fn single_record_has_no_rate() {
            assert!(rate_threshold(&beats_at(&[0])).is_none());
        }

        #[test]
        fn equal_timestamps_are_skipped() {
            let records = beats_at(&[0, 0]);
            assert!(rate_threshold(&records).is_none());
            assert!(evaluate(&records).is_empty());
        }
    }

    mod irregular_trend_tests {
        use super::*;

        #[test]
        fn alternating_rates_fire() {
            // Gaps alternate 1000ms / 500ms: rates 60 and 120 bpm.
            let records = beats_at(&[0, 1_000, 1_500, 2_500, 3_000, 4_000, 4_500]);
            let finding = irregular_trend(&records).unwrap();
            assert_eq!(finding.condition, ABNORMAL_TREND);
            assert_eq!(finding.timestamp, 4_000);
        }

        #[test]
        fn too_few_jumps_do_not_fire() {
            let records = beats_at(&[0, 1_000, 1_500, 2_500, 3_000, 4_000]);
            assert!(irregular_trend(&records).is_none());
        }

        #[test]
        fn steady_rhythm_does_not_fire() {
            let records = beats_at(&[0, 800, 1_600, 2_400, 3_200, 4_000, 4_800, 5_600]);
            assert!(irregular_trend(&records).is_none());
        }

        #[test]
        fn steady_stretch_pays_down_the_score() {
            // Six jumps in total, but two steady pairs in the middle.
            let records = beats_at(&[
                0, 1_000, 1_500, 2_500, 2_980, 3_460, 3_960, 4_960, 5_460, 6_460,
            ]);
            assert!(irregular_trend(&records).is_none());
        }
    }

    mod peak_tests {
        use super::*;

        #[test]
        fn most_recent_peak_is_reported() {
            let records = vec![
                Record::new(1, SignalType::Ecg, 160.0, 1_000),
                Record::new(1, SignalType::Ecg, 0.5, 2_000),
                Record::new(1, SignalType::Ecg, 155.0, 3_000),
                Record::new(1, SignalType::Ecg, 0.4, 4_000),
            ];
            let finding = peak(&records).unwrap();
            assert_eq!(finding.condition, ABNORMAL_PEAK);
            assert_eq!(finding.timestamp, 3_000);
        }

        #[test]
        fn value_at_threshold_is_not_a_peak() {
            let records = vec![Record::new(1, SignalType::Ecg, PEAK_THRESHOLD, 1_000)];
            assert!(peak(&records).is_none());
        }
    }

    #[test]
    fn non_ecg_records_are_ignored() {
        let mut records = beats_at(&[0, 800]);
        records.insert(1, Record::new(1, SignalType::SystolicPressure, 200.0, 400));
        assert!(conditions(&evaluate(&records)).is_empty());
    }
}
