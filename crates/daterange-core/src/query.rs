//! Backend filter query generation.
//!
//! A committed range becomes either a single `range` condition on one field,
//! or a `bool.must` conjunction over a start/end field pair.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::config::RangeConfig;
use crate::error::ConfigError;
use crate::format::{format_timestamp, QueryFormat};
use crate::range::CommittedValue;

/// Which backend field(s) the range filters on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldConfig {
    /// One date field that must fall inside the range.
    Single(String),
    /// Start and end fields of a record spanning the range.
    Pair(String, String),
}

impl FieldConfig {
    /// Build from a list of field names.
    ///
    /// One name is `Single`, two are `Pair`. Longer lists only use the
    /// first name.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self, ConfigError> {
        let names: Vec<&str> = fields.iter().map(|f| f.as_ref()).collect();
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(invalid_field("field names must not be empty"));
        }
        match names.as_slice() {
            [] => Err(invalid_field("at least one field is required")),
            [start, end] => Ok(FieldConfig::Pair(start.to_string(), end.to_string())),
            [first, ..] => Ok(FieldConfig::Single(first.to_string())),
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            FieldConfig::Single(f) => vec![f.as_str()],
            FieldConfig::Pair(a, b) => vec![a.as_str(), b.as_str()],
        }
    }
}

fn invalid_field(message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: "data_field".into(),
        message: message.into(),
    }
}

impl Serialize for FieldConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldConfig::Single(f) => serializer.serialize_str(f),
            FieldConfig::Pair(a, b) => [a, b].serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        let fields = match Raw::deserialize(deserializer)? {
            Raw::One(f) => vec![f],
            Raw::Many(fs) => fs,
        };
        FieldConfig::from_fields(fields.as_slice()).map_err(serde::de::Error::custom)
    }
}

/// Build the default query for `range`. `None` when there is no range.
pub fn build_query(
    range: Option<&CommittedValue>,
    fields: &FieldConfig,
    format: &QueryFormat,
) -> Option<Value> {
    let range = range?;
    let start = Value::from(format_timestamp(range.start, format));
    let end = Value::from(format_timestamp(range.end, format));

    let query = match fields {
        FieldConfig::Pair(start_field, end_field) => json!({
            "bool": {
                "must": [
                    { "range": { start_field.as_str(): { "lte": start } } },
                    { "range": { end_field.as_str(): { "gte": end } } },
                ]
            }
        }),
        FieldConfig::Single(field) => json!({
            "range": { field.as_str(): { "gte": start, "lte": end } }
        }),
    };
    Some(query)
}

/// Host-supplied replacement for [`build_query`].
pub trait CustomQuery: Send + Sync {
    fn build(&self, range: Option<&CommittedValue>, config: &RangeConfig) -> Option<Value>;
}

impl<F> CustomQuery for F
where
    F: Fn(Option<&CommittedValue>, &RangeConfig) -> Option<Value> + Send + Sync,
{
    fn build(&self, range: Option<&CommittedValue>, config: &RangeConfig) -> Option<Value> {
        self(range, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_field_query() {
        let fields = FieldConfig::Single("created".into());
        let q = build_query(
            Some(&CommittedValue::new(1_000, 2_000)),
            &fields,
            &QueryFormat::EpochMillis,
        )
        .unwrap();
        assert_eq!(q, json!({ "range": { "created": { "gte": 1000, "lte": 2000 } } }));
    }

    #[test]
    fn pair_field_query_spans_window() {
        let fields = FieldConfig::Pair("eventStart".into(), "eventEnd".into());
        let q = build_query(
            Some(&CommittedValue::new(1_700_000_000_500, 1_700_086_400_500)),
            &fields,
            &QueryFormat::EpochSeconds,
        )
        .unwrap();
        assert_eq!(
            q,
            json!({
                "bool": { "must": [
                    { "range": { "eventStart": { "lte": 1_700_000_000 } } },
                    { "range": { "eventEnd": { "gte": 1_700_086_400 } } },
                ]}
            })
        );
    }

    #[test]
    fn no_range_no_query() {
        let fields = FieldConfig::Pair("eventStart".into(), "eventEnd".into());
        assert!(build_query(None, &fields, &QueryFormat::EpochMillis).is_none());
    }

    #[test]
    fn named_format_renders_strings() {
        let fields = FieldConfig::Single("day".into());
        // 2024-01-30T00:00:00Z .. 2024-02-02T00:00:00Z
        let q = build_query(
            Some(&CommittedValue::new(1_706_572_800_000, 1_706_832_000_000)),
            &fields,
            &QueryFormat::Named("basic_date".into()),
        )
        .unwrap();
        assert_eq!(q["range"]["day"]["gte"], "20240130");
        assert_eq!(q["range"]["day"]["lte"], "20240202");
    }

    #[test]
    fn field_config_from_lists() {
        assert_eq!(
            FieldConfig::from_fields(&["a"]).unwrap(),
            FieldConfig::Single("a".into())
        );
        assert_eq!(
            FieldConfig::from_fields(&["a", "b"]).unwrap(),
            FieldConfig::Pair("a".into(), "b".into())
        );
        assert_eq!(
            FieldConfig::from_fields(&["a", "b", "c"]).unwrap(),
            FieldConfig::Single("a".into())
        );
        assert!(FieldConfig::from_fields::<&str>(&[]).is_err());
        assert!(FieldConfig::from_fields(&[""]).is_err());
    }

    #[test]
    fn field_config_deserializes_string_or_list() {
        let single: FieldConfig = serde_json::from_str("\"created\"").unwrap();
        assert_eq!(single, FieldConfig::Single("created".into()));
        let pair: FieldConfig = serde_json::from_str("[\"from\", \"to\"]").unwrap();
        assert_eq!(pair, FieldConfig::Pair("from".into(), "to".into()));
        assert!(serde_json::from_str::<FieldConfig>("[]").is_err());
    }
}
