use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::range::{CommittedValue, DatePick};

/// Every state change of a controller produces an Event.
/// Hosts drain them for logging, replay, or UI feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    Mounted {
        component_id: String,
        at: DateTime<Utc>,
    },
    Unmounted {
        component_id: String,
        at: DateTime<Utc>,
    },
    /// A start was chosen; the range is waiting for its end.
    RangeStarted {
        start: DatePick,
        at: DateTime<Utc>,
    },
    RangeCommitted {
        start: DatePick,
        end: DatePick,
        at: DateTime<Utc>,
    },
    RangeReset {
        at: DateTime<Utc>,
    },
    /// An external value is being fed through the picker.
    Seeded {
        start: Option<i64>,
        end: Option<i64>,
        at: DateTime<Utc>,
    },
    /// Interception is waiting on the host; later input is queued.
    InterceptionDeferred {
        value: Option<CommittedValue>,
        at: DateTime<Utc>,
    },
    /// A queued reset arrived before the deferred interception resolved.
    InterceptionSuperseded {
        value: Option<CommittedValue>,
        at: DateTime<Utc>,
    },
    /// The host vetoed the change; nothing was published.
    ValueSuppressed {
        value: Option<CommittedValue>,
        at: DateTime<Utc>,
    },
    ValuePublished {
        value: Option<CommittedValue>,
        query: Option<serde_json::Value>,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::Mounted { at, .. }
            | Event::Unmounted { at, .. }
            | Event::RangeStarted { at, .. }
            | Event::RangeCommitted { at, .. }
            | Event::RangeReset { at }
            | Event::Seeded { at, .. }
            | Event::InterceptionDeferred { at, .. }
            | Event::InterceptionSuperseded { at, .. }
            | Event::ValueSuppressed { at, .. }
            | Event::ValuePublished { at, .. } => *at,
        }
    }
}
