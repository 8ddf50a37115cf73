//! Date formatting for backend queries.
//!
//! Converts a calendar instant into the representation the search backend
//! expects for a date field: epoch milliseconds, epoch seconds, or a string
//! rendered with one of the backend's named date patterns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Named date patterns understood by the backend, with their chrono rendering.
const NAMED_PATTERNS: &[(&str, &str)] = &[
    ("date", "%Y-%m-%d"),
    ("basic_date", "%Y%m%d"),
    ("basic_date_time", "%Y%m%dT%H%M%S%.3f%:z"),
    ("basic_date_time_no_millis", "%Y%m%dT%H%M%S%:z"),
    ("date_time_no_millis", "%Y-%m-%dT%H:%M:%S%:z"),
    ("basic_time", "%H%M%S%.3f%:z"),
    ("basic_time_no_millis", "%H%M%S%:z"),
];

/// How dates are rendered into queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryFormat {
    #[default]
    EpochMillis,
    EpochSeconds,
    /// One of the backend's named patterns (e.g. `basic_date`).
    Named(String),
    /// Anything else. Dates pass through unmodified.
    Unrecognized(String),
}

impl QueryFormat {
    pub fn name(&self) -> &str {
        match self {
            QueryFormat::EpochMillis => "epoch_millis",
            QueryFormat::EpochSeconds => "epoch_seconds",
            QueryFormat::Named(name) | QueryFormat::Unrecognized(name) => name,
        }
    }

    fn pattern(name: &str) -> Option<&'static str> {
        NAMED_PATTERNS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
    }
}

impl FromStr for QueryFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "epoch_millis" => QueryFormat::EpochMillis,
            // The backend spells it `epoch_second`; accept both.
            "epoch_second" | "epoch_seconds" => QueryFormat::EpochSeconds,
            other if Self::pattern(other).is_some() => QueryFormat::Named(other.to_string()),
            other => QueryFormat::Unrecognized(other.to_string()),
        })
    }
}

impl fmt::Display for QueryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for QueryFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for QueryFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // Infallible: unknown names become `Unrecognized`.
        Ok(s.parse().unwrap_or_default())
    }
}

/// A date rendered for the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormattedDate {
    Integer(i64),
    Text(String),
    /// Unformatted instant; serializes as RFC 3339.
    Raw(DateTime<Utc>),
}

impl From<FormattedDate> for serde_json::Value {
    fn from(value: FormattedDate) -> Self {
        match value {
            FormattedDate::Integer(n) => serde_json::Value::from(n),
            FormattedDate::Text(s) => serde_json::Value::String(s),
            FormattedDate::Raw(dt) => serde_json::Value::String(dt.to_rfc3339()),
        }
    }
}

/// Render `date` in `format`. Never fails; unknown formats return the date as-is.
pub fn format_date(date: DateTime<Utc>, format: &QueryFormat) -> FormattedDate {
    match format {
        QueryFormat::EpochMillis => FormattedDate::Integer(date.timestamp_millis()),
        QueryFormat::EpochSeconds => {
            FormattedDate::Integer(date.timestamp_millis().div_euclid(1000))
        }
        QueryFormat::Named(name) | QueryFormat::Unrecognized(name) => {
            match QueryFormat::pattern(name) {
                Some(pattern) => FormattedDate::Text(date.format(pattern).to_string()),
                None => {
                    debug!(format = %name, "unrecognized query format, passing date through");
                    FormattedDate::Raw(date)
                }
            }
        }
    }
}

/// Convenience wrapper over [`format_date`] for epoch-millisecond timestamps.
pub fn format_timestamp(timestamp_ms: i64, format: &QueryFormat) -> FormattedDate {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(date) => format_date(date, format),
        // Outside chrono's range; the raw number is the only faithful rendering.
        None => FormattedDate::Integer(timestamp_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_millis_is_identity() {
        let out = format_timestamp(1_700_000_000_500, &QueryFormat::EpochMillis);
        assert_eq!(out, FormattedDate::Integer(1_700_000_000_500));
    }

    #[test]
    fn epoch_seconds_floors() {
        let out = format_timestamp(1_700_000_000_500, &QueryFormat::EpochSeconds);
        assert_eq!(out, FormattedDate::Integer(1_700_000_000));

        let out = format_timestamp(1_700_000_000_999, &QueryFormat::EpochSeconds);
        assert_eq!(out, FormattedDate::Integer(1_700_000_000));
    }

    #[test]
    fn epoch_seconds_floors_before_epoch() {
        let out = format_timestamp(-1, &QueryFormat::EpochSeconds);
        assert_eq!(out, FormattedDate::Integer(-1));
    }

    #[test]
    fn named_patterns_render_in_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 30, 8, 5, 9).unwrap();
        let fmt: QueryFormat = "basic_date".parse().unwrap();
        assert_eq!(format_date(ts, &fmt), FormattedDate::Text("20240130".into()));

        let fmt: QueryFormat = "date".parse().unwrap();
        assert_eq!(format_date(ts, &fmt), FormattedDate::Text("2024-01-30".into()));

        let fmt: QueryFormat = "date_time_no_millis".parse().unwrap();
        assert_eq!(
            format_date(ts, &fmt),
            FormattedDate::Text("2024-01-30T08:05:09+00:00".into())
        );
    }

    #[test]
    fn unknown_format_passes_date_through() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap();
        let fmt: QueryFormat = "week_date".parse().unwrap();
        assert_eq!(fmt, QueryFormat::Unrecognized("week_date".into()));
        assert_eq!(format_date(ts, &fmt), FormattedDate::Raw(ts));
    }

    #[test]
    fn hand_built_named_format_with_unknown_name_passes_through() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 30, 0, 0, 0).unwrap();
        let fmt = QueryFormat::Named("week_date".into());
        assert_eq!(format_date(ts, &fmt), FormattedDate::Raw(ts));
    }

    #[test]
    fn both_second_spellings_parse() {
        assert_eq!("epoch_second".parse::<QueryFormat>().unwrap(), QueryFormat::EpochSeconds);
        assert_eq!("epoch_seconds".parse::<QueryFormat>().unwrap(), QueryFormat::EpochSeconds);
    }

    #[test]
    fn serde_uses_names() {
        let fmt: QueryFormat = serde_json::from_str("\"basic_date\"").unwrap();
        assert_eq!(fmt, QueryFormat::Named("basic_date".into()));
        assert_eq!(serde_json::to_string(&QueryFormat::EpochSeconds).unwrap(), "\"epoch_seconds\"");
    }
}
