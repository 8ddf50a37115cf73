//! Range selection state machine.
//!
//! A range is built from single-date picks. The machine is a pure transition
//! function over an explicit state value; the controller owns the only copy.
//!
//! ## State Transitions
//!
//! ```text
//! Empty --pick--> Pending --later pick--> Committed
//!                 Pending --same/earlier pick--> Pending (new start)
//! Committed --pick--> Pending (fresh range)
//! any --reset--> Empty
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// A single day chosen on the calendar, or synthesized from an external date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatePick {
    /// `yyyy-MM-dd`, the calendar's key for the day.
    pub date_string: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

impl DatePick {
    pub fn new(date_string: impl Into<String>, timestamp: i64) -> Self {
        Self {
            date_string: date_string.into(),
            timestamp,
        }
    }

    /// Build a pick for an instant, deriving the UTC calendar day.
    pub fn from_datetime(date: DateTime<Utc>) -> Self {
        Self {
            date_string: date.format("%Y-%m-%d").to_string(),
            timestamp: date.timestamp_millis(),
        }
    }

    /// Build a pick from epoch milliseconds. `None` if out of chrono's range.
    pub fn from_timestamp(timestamp_ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(timestamp_ms)
            .single()
            .map(Self::from_datetime)
    }

    /// Midnight UTC of `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_datetime(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// The calendar day of the pick, from its timestamp.
    pub fn date(&self) -> Option<NaiveDate> {
        self.datetime().map(|dt| dt.date_naive())
    }

    /// The day the calendar showed, from `date_string`.
    ///
    /// Calendars outside UTC send local-midnight timestamps whose UTC day is
    /// the day before, so the string is authoritative. Falls back to
    /// [`DatePick::date`] when the string does not parse.
    pub fn calendar_day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date_string, "%Y-%m-%d")
            .ok()
            .or_else(|| self.date())
    }
}

/// The externally visible form of a committed range, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommittedValue {
    pub start: i64,
    pub end: i64,
}

impl CommittedValue {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Like [`CommittedValue::new`], but rejects ranges that do not move forward.
    pub fn try_new(start: i64, end: i64) -> Result<Self> {
        if start >= end {
            return Err(ValidationError::InvalidDateRange { start, end }.into());
        }
        Ok(Self { start, end })
    }
}

/// Current selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RangeState {
    #[default]
    Empty,
    /// Start chosen, waiting for an end.
    Pending { start: DatePick },
    /// Both ends chosen; `start.timestamp < end.timestamp`.
    Committed { start: DatePick, end: DatePick },
}

/// A range change that must be published: a committed value, or `None` for a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    pub value: Option<CommittedValue>,
}

/// Result of feeding one event to [`RangeState::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: RangeState,
    pub commit: Option<Commit>,
}

impl RangeState {
    /// Advance the machine by one pick, or reset it with `None`.
    pub fn transition(self, pick: Option<DatePick>) -> Transition {
        let Some(pick) = pick else {
            return Transition {
                state: RangeState::Empty,
                commit: Some(Commit { value: None }),
            };
        };

        match self {
            RangeState::Pending { start } if start.timestamp < pick.timestamp => {
                let value = CommittedValue::new(start.timestamp, pick.timestamp);
                Transition {
                    state: RangeState::Committed { start, end: pick },
                    commit: Some(Commit { value: Some(value) }),
                }
            }
            // Empty, Committed, or an end that is not after the start: begin again.
            _ => Transition {
                state: RangeState::Pending { start: pick },
                commit: None,
            },
        }
    }

    pub fn start(&self) -> Option<&DatePick> {
        match self {
            RangeState::Empty => None,
            RangeState::Pending { start } | RangeState::Committed { start, .. } => Some(start),
        }
    }

    pub fn end(&self) -> Option<&DatePick> {
        match self {
            RangeState::Committed { end, .. } => Some(end),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RangeState::Empty)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RangeState::Pending { .. })
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, RangeState::Committed { .. })
    }

    /// The committed value, if the range is complete.
    pub fn committed_value(&self) -> Option<CommittedValue> {
        match self {
            RangeState::Committed { start, end } => {
                Some(CommittedValue::new(start.timestamp, end.timestamp))
            }
            _ => None,
        }
    }

    /// `"<start> to <end>"`, with an empty end while pending.
    pub fn describe(&self) -> Option<String> {
        let start = self.start()?;
        let end = self.end().map(|e| e.date_string.as_str()).unwrap_or("");
        Some(format!("{} to {}", start.date_string, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(day: u32, ts: i64) -> DatePick {
        DatePick::new(format!("2024-01-{day:02}"), ts)
    }

    #[test]
    fn try_new_rejects_backward_ranges() {
        assert_eq!(CommittedValue::try_new(100, 300).unwrap(), CommittedValue::new(100, 300));
        assert!(matches!(
            CommittedValue::try_new(300, 100),
            Err(crate::error::CoreError::Validation(ValidationError::InvalidDateRange {
                start: 300,
                end: 100
            }))
        ));
        assert!(CommittedValue::try_new(100, 100).is_err());
    }

    #[test]
    fn calendar_day_prefers_date_string() {
        // 2024-01-30T00:00+02:00 is still Jan 29 in UTC.
        let p = DatePick::new("2024-01-30", 1_706_565_600_000);
        assert_eq!(p.date(), NaiveDate::from_ymd_opt(2024, 1, 29));
        assert_eq!(p.calendar_day(), NaiveDate::from_ymd_opt(2024, 1, 30));
    }

    #[test]
    fn first_pick_is_pending() {
        let t = RangeState::Empty.transition(Some(pick(1, 100)));
        assert_eq!(t.state, RangeState::Pending { start: pick(1, 100) });
        assert!(t.commit.is_none());
    }

    #[test]
    fn later_pick_commits() {
        let state = RangeState::Pending { start: pick(1, 100) };
        let t = state.transition(Some(pick(3, 300)));
        assert!(t.state.is_committed());
        assert_eq!(
            t.commit,
            Some(Commit {
                value: Some(CommittedValue::new(100, 300))
            })
        );
    }

    #[test]
    fn equal_pick_restarts() {
        let state = RangeState::Pending { start: pick(1, 100) };
        let t = state.transition(Some(pick(1, 100)));
        assert_eq!(t.state, RangeState::Pending { start: pick(1, 100) });
        assert!(t.commit.is_none());
    }

    #[test]
    fn earlier_pick_replaces_start() {
        let state = RangeState::Pending { start: pick(5, 500) };
        let t = state.transition(Some(pick(2, 200)));
        assert_eq!(t.state, RangeState::Pending { start: pick(2, 200) });
        assert!(t.commit.is_none());
    }

    #[test]
    fn pick_while_committed_starts_fresh() {
        let state = RangeState::Committed {
            start: pick(1, 100),
            end: pick(3, 300),
        };
        let t = state.transition(Some(pick(9, 900)));
        assert_eq!(t.state, RangeState::Pending { start: pick(9, 900) });
        assert!(t.commit.is_none());
    }

    #[test]
    fn reset_from_every_state() {
        let states = [
            RangeState::Empty,
            RangeState::Pending { start: pick(1, 100) },
            RangeState::Committed {
                start: pick(1, 100),
                end: pick(3, 300),
            },
        ];
        for state in states {
            let t = state.transition(None);
            assert_eq!(t.state, RangeState::Empty);
            assert_eq!(t.commit, Some(Commit { value: None }));
        }
    }

    #[test]
    fn pick_from_timestamp_uses_utc_day() {
        // 2024-01-31T23:59:59.999Z
        let p = DatePick::from_timestamp(1_706_745_599_999).unwrap();
        assert_eq!(p.date_string, "2024-01-31");
        assert_eq!(p.date(), NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn describe_pending_and_committed() {
        let pending = RangeState::Pending { start: pick(1, 100) };
        assert_eq!(pending.describe().as_deref(), Some("2024-01-01 to "));
        let committed = RangeState::Committed {
            start: pick(1, 100),
            end: pick(3, 300),
        };
        assert_eq!(committed.describe().as_deref(), Some("2024-01-01 to 2024-01-03"));
        assert_eq!(RangeState::Empty.describe(), None);
    }
}
