//! Timestamp parsing, input errors and human-readable durations

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("{0} is missing")]
    Missing(&'static str),

    #[error("{field} is not a timestamp: {value:?}")]
    Malformed { field: &'static str, value: String },

    #[error("threshold of {0} minutes is out of range")]
    ThresholdOutOfRange(i64),
}

/// Parse an RFC 3339 timestamp, or a naive `YYYY-MM-DD HH:MM[:SS]` taken as UTC
pub fn parse_timestamp(field: &'static str, raw: Option<&str>) -> Result<DateTime<Utc>, InputError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(InputError::Missing(field))?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(InputError::Malformed {
        field,
        value: raw.to_string(),
    })
}

/// Whole minutes, rounded down
pub fn whole_minutes(d: Duration) -> i64 {
    d.num_minutes()
}

/// "just now", "1 minute ago", "5 minutes ago", "2 hours ago", "3 days ago"
pub fn relative_phrase(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "just now".to_string();
    };

    let elapsed = now - at;
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return plural(hours, "hour");
    }
    plural(elapsed.num_days(), "day")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
