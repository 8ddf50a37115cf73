//! Host-facing controller configuration.
//!
//! Deserializes from TOML or JSON. Every option but `component_id` and
//! `data_field` has a default:
//!
//! ```toml
//! component_id = "when"
//! data_field = ["eventStart", "eventEnd"]
//! query_format = "basic_date"
//! placeholder = "Pick dates"
//! filter_label = "When"
//! react = { and = ["city"] }
//!
//! [default_selected]
//! start = "2024-01-30"
//! end = "2024-02-02"
//! ```

use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::format::QueryFormat;
use crate::query::FieldConfig;
use crate::range::{CommittedValue, DatePick};
use crate::store::DependencySpec;

/// A date supplied from outside: epoch milliseconds or a date string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Millis(i64),
    Text(String),
}

impl DateInput {
    /// Interpret the input. Accepts RFC 3339 or `yyyy-MM-dd` (midnight UTC).
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            DateInput::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            DateInput::Text(s) => {
                let s = s.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Some(dt.with_timezone(&Utc));
                }
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(DatePick::from_date)
                    .and_then(|p| p.datetime())
            }
        }
    }

    pub fn to_pick(&self) -> Option<DatePick> {
        self.resolve().map(DatePick::from_datetime)
    }
}

impl From<i64> for DateInput {
    fn from(ms: i64) -> Self {
        DateInput::Millis(ms)
    }
}

impl From<&str> for DateInput {
    fn from(s: &str) -> Self {
        DateInput::Text(s.to_string())
    }
}

/// An externally supplied selection. `end` may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRange {
    pub start: Option<DateInput>,
    #[serde(default)]
    pub end: Option<DateInput>,
}

impl ExternalRange {
    pub fn new(start: impl Into<DateInput>, end: impl Into<DateInput>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    pub fn open(start: impl Into<DateInput>) -> Self {
        Self {
            start: Some(start.into()),
            end: None,
        }
    }
}

impl From<CommittedValue> for ExternalRange {
    fn from(value: CommittedValue) -> Self {
        ExternalRange::new(value.start, value.end)
    }
}

/// Configuration for one date range controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    /// Key this controller owns in the selection store.
    pub component_id: String,
    pub data_field: FieldConfig,
    #[serde(default)]
    pub query_format: QueryFormat,
    #[serde(default)]
    pub default_selected: Option<ExternalRange>,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_true")]
    pub show_filter: bool,
    #[serde(default)]
    pub filter_label: Option<String>,
    #[serde(default)]
    pub persist_in_url: bool,
    /// Other controllers whose filters this one reacts to.
    #[serde(default)]
    pub react: Option<DependencySpec>,
    /// Month shown by the calendar when nothing is selected.
    #[serde(default)]
    pub start_date: Option<DateInput>,
}

fn default_placeholder() -> String {
    "Select a range of dates".into()
}
fn default_true() -> bool {
    true
}

impl RangeConfig {
    pub fn new(component_id: impl Into<String>, data_field: FieldConfig) -> Self {
        Self {
            component_id: component_id.into(),
            data_field,
            query_format: QueryFormat::default(),
            default_selected: None,
            placeholder: default_placeholder(),
            show_filter: default_true(),
            filter_label: None,
            persist_in_url: false,
            react: None,
            start_date: None,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: RangeConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.component_id.trim().is_empty() {
            return Err(ConfigError::MissingKey("component_id".into()));
        }
        Ok(())
    }

    /// Label shown for the active filter; falls back to the component id.
    pub fn label(&self) -> &str {
        self.filter_label.as_deref().unwrap_or(&self.component_id)
    }
}
