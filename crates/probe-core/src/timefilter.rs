use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::duration::parse_duration;
use crate::error::ConfigError;

/// Age comparison against a cutoff computed from now minus a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeCmp {
    OlderThan,
    NewerThan,
}

impl FromStr for AgeCmp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "older_than" => Ok(Self::OlderThan),
            "newer_than" => Ok(Self::NewerThan),
            other => Err(ConfigError::UnknownOperator {
                token: other.to_owned(),
            }),
        }
    }
}

/// Keep records whose `field` timestamp is older/newer than `duration` ago.
///
/// Records with a missing or unparsable timestamp are excluded: an
/// unverifiable record is never defaulted to recent or stale.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDuration` when the duration string is
/// malformed.
pub fn filter_by_age(
    records: &[Value],
    field: &str,
    cmp: AgeCmp,
    duration: &str,
) -> Result<Vec<Value>, ConfigError> {
    filter_with_now(records, field, cmp, duration, Utc::now())
}

fn filter_with_now(
    records: &[Value],
    field: &str,
    cmp: AgeCmp,
    duration: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Value>, ConfigError> {
    let age = parse_duration(duration)?;
    let age = chrono::Duration::from_std(age).map_err(|_| ConfigError::InvalidDuration {
        input: duration.to_owned(),
        reason: "duration out of range".to_owned(),
    })?;
    let cutoff = now - age;

    let kept = records
        .iter()
        .filter(|record| {
            record
                .get(field)
                .and_then(parse_timestamp)
                .is_some_and(|ts| match cmp {
                    AgeCmp::OlderThan => ts <= cutoff,
                    AgeCmp::NewerThan => ts > cutoff,
                })
        })
        .cloned()
        .collect();
    Ok(kept)
}

/// Timestamps arrive as RFC 3339 strings or epoch seconds, depending on
/// which CLI produced the record.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}
