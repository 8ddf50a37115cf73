//! Calendar markings for the current selection.
//!
//! The calendar renders a "period" style selection from a map of
//! `yyyy-MM-dd` keys to markings. Days between the ends are stepped on the
//! calendar, not in 24h increments, so month and year boundaries are exact.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::range::RangeState;

const START_COLOR: &str = "#0B6AFF";
const PERIOD_COLOR: &str = "#0b6aff";
const TEXT_COLOR: &str = "#fff";

/// Upper bound on in-range days marked for one selection (about ten years).
pub const MAX_MARKED_DAYS: usize = 3660;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkingRole {
    Start,
    InRange,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marking {
    pub role: MarkingRole,
    pub color: String,
    pub text_color: String,
}

impl Marking {
    fn new(role: MarkingRole) -> Self {
        let color = match role {
            MarkingRole::Start => START_COLOR,
            MarkingRole::InRange | MarkingRole::End => PERIOD_COLOR,
        };
        Self {
            role,
            color: color.into(),
            text_color: TEXT_COLOR.into(),
        }
    }
}

pub type Markings = BTreeMap<String, Marking>;

/// Markings for `state`: the start, every day strictly between, and the end.
pub fn compute_markings(state: &RangeState) -> Markings {
    let mut marks = Markings::new();
    let Some(start) = state.start() else {
        return marks;
    };
    marks.insert(start.date_string.clone(), Marking::new(MarkingRole::Start));

    if let Some(end) = state.end() {
        if let (Some(first), Some(last)) = (start.calendar_day(), end.calendar_day()) {
            let span = (last - first).num_days();
            if span > MAX_MARKED_DAYS as i64 + 1 {
                warn!(
                    start = %start.date_string,
                    end = %end.date_string,
                    span,
                    "range too long to mark every day, truncating"
                );
            }
            for day in days_between(first, last).take(MAX_MARKED_DAYS) {
                marks.insert(
                    day.format("%Y-%m-%d").to_string(),
                    Marking::new(MarkingRole::InRange),
                );
            }
        }
        // Written last: a same-day range shows as its end.
        marks.insert(end.date_string.clone(), Marking::new(MarkingRole::End));
    }
    marks
}

/// Days strictly after `first` and strictly before `last`.
fn days_between(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(first.succ_opt(), |d| d.succ_opt()).take_while(move |d| *d < last)
}

/// How the calendar draws markings. Ranges always use `Period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkingType {
    #[default]
    Period,
}

/// Everything the calendar widget needs to render the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    /// Day the calendar opens on.
    pub current: String,
    pub marked_dates: Markings,
    pub marking_type: MarkingType,
}

impl CalendarView {
    /// `current` is the selection start if any, else `fallback`.
    pub fn new(state: &RangeState, fallback: NaiveDate) -> Self {
        let current = state
            .start()
            .map(|s| s.date_string.clone())
            .unwrap_or_else(|| fallback.format("%Y-%m-%d").to_string());
        Self {
            current,
            marked_dates: compute_markings(state),
            marking_type: MarkingType::Period,
        }
    }
}
