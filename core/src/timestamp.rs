use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::ValidationError;

const NAIVE_DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Accepts RFC 3339 timestamps, naive date-times and plain dates.
pub fn validate_iso8601(value: &str, param_name: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    let valid = DateTime::parse_from_rfc3339(value).is_ok()
        || NAIVE_DATE_TIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(value, format).is_ok())
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidTimestamp {
            param: param_name.to_string(),
            value: value.to_string(),
        })
    }
}
