//! Line-oriented wire format: `patientId,timestampMs,signalType,value`.
//!
//! This is the ingestion boundary. Anything that fails to parse here never
//! reaches the store.

use crate::error::{RecordError, Result};
use crate::types::{Record, SignalType};

/// Number of comma-separated fields in a record line.
pub const FIELD_COUNT: usize = 4;

/// Value carried by a call-button record when it is pressed.
pub const CALL_TRIGGERED: f64 = 1.0;

/// Value carried by a call-button record when it is released.
pub const CALL_RESOLVED: f64 = 0.0;

/// Parses one wire line into a [`Record`].
///
/// The value field accepts a plain float, a float with a trailing `%`, or
/// the call-button words `triggered` and `resolved`.
///
/// # Errors
///
/// Returns `RecordError::MalformedLine` for a wrong field count and
/// `RecordError::InvalidField` for a field that does not parse.
pub fn parse_line(line: &str) -> Result<Record> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(RecordError::MalformedLine {
            reason: format!("expected {FIELD_COUNT} fields, got {}", fields.len()),
        });
    }

    let patient_id = fields[0]
        .parse::<u32>()
        .map_err(|_| invalid("patient id", fields[0]))?;
    let timestamp = fields[1]
        .parse::<i64>()
        .map_err(|_| invalid("timestamp", fields[1]))?;

    if fields[2].is_empty() {
        return Err(invalid("signal type", fields[2]));
    }
    let signal_type: SignalType = fields[2].to_string().into();
    let value = parse_value(fields[3])?;

    Ok(Record::new(patient_id, signal_type, value, timestamp))
}

/// Renders a record back into its wire line.
#[must_use]
pub fn format_line(record: &Record) -> String {
    format!(
        "{},{},{},{}",
        record.patient_id(),
        record.timestamp(),
        record.signal_type(),
        record.value()
    )
}

fn parse_value(raw: &str) -> Result<f64> {
    match raw {
        "triggered" => return Ok(CALL_TRIGGERED),
        "resolved" => return Ok(CALL_RESOLVED),
        _ => {}
    }

    let numeric = raw.strip_suffix('%').unwrap_or(raw);
    match numeric.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid("value", raw)),
    }
}

fn invalid(field: &'static str, value: &str) -> RecordError {
    RecordError::InvalidField {
        field,
        value: value.to_string(),
    }
}
