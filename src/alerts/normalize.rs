// src/alerts/normalize.rs
//! Field cleanup for service alerts before they reach the prompt.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Alert, NormalizedAlert, ID_FIELD};

/// Fields that tend to confuse the text backend.
pub const DROPPED_FIELDS: [&str; 4] = [ID_FIELD, "publish_date", "effective_date", "expiry_date"];

/// UTC timestamps rewritten to SAST.
pub const TIMESTAMP_FIELDS: [&str; 2] = ["start_timestamp", "forecast_end_timestamp"];

/// Length of the zone suffix the upstream feed appends (".000Z").
const ZONE_SUFFIX_LEN: usize = 5;
const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const SAST_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const SAST_OFFSET_SECS: i32 = 2 * 3600;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing timestamp field `{0}`")]
    MissingField(String),
    #[error("timestamp field `{0}` is not a string")]
    NotAString(String),
    #[error("cannot parse `{value}` in `{field}` as a UTC timestamp")]
    BadTimestamp { field: String, value: String },
}

/// Produce a cleaned copy of `alert`; the input is left untouched.
pub fn normalize(alert: &Alert) -> Result<NormalizedAlert, NormalizeError> {
    let mut fields = Map::with_capacity(alert.fields().len());
    for (name, value) in alert.fields() {
        if value.is_null() || DROPPED_FIELDS.contains(&name.as_str()) {
            continue;
        }
        fields.insert(name.clone(), value.clone());
    }

    for field in TIMESTAMP_FIELDS {
        let raw = fields
            .get(field)
            .ok_or_else(|| NormalizeError::MissingField(field.to_string()))?
            .as_str()
            .ok_or_else(|| NormalizeError::NotAString(field.to_string()))?;
        let converted = to_sast(raw).ok_or_else(|| NormalizeError::BadTimestamp {
            field: field.to_string(),
            value: raw.to_string(),
        })?;
        fields.insert(field.to_string(), Value::String(converted));
    }

    Ok(NormalizedAlert::from_fields(fields))
}

/// Convert a UTC timestamp to `YYYY-MM-DDTHH:MM:SS+02:00`.
///
/// RFC 3339 input is honoured as written. Anything else has its 5-character
/// zone suffix cut off and is read as naive UTC.
pub fn to_sast(utc: &str) -> Option<String> {
    let sast = FixedOffset::east_opt(SAST_OFFSET_SECS)?;
    let instant: DateTime<Utc> = match DateTime::parse_from_rfc3339(utc.trim()) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            let (cut, _) = utc.char_indices().rev().nth(ZONE_SUFFIX_LEN - 1)?;
            NaiveDateTime::parse_from_str(&utc[..cut], NAIVE_FORMAT)
                .ok()?
                .and_utc()
        }
    };
    Some(instant.with_timezone(&sast).format(SAST_FORMAT).to_string())
}
