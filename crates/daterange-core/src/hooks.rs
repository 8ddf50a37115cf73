//! Host hooks around a value change.
//!
//! Before a change is published the host may intercept it; after it is
//! published the host is notified. Interception can finish immediately or be
//! deferred and resolved later with [`crate::DateRangeController::resolve_interception`].

use serde::{Deserialize, Serialize};

use crate::format::{format_timestamp, FormattedDate, QueryFormat};
use crate::range::CommittedValue;

/// A range with both ends rendered in the configured query format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedRange {
    pub start: FormattedDate,
    pub end: FormattedDate,
}

impl FormattedRange {
    pub fn new(value: &CommittedValue, format: &QueryFormat) -> Self {
        Self {
            start: format_timestamp(value.start, format),
            end: format_timestamp(value.end, format),
        }
    }
}

/// A value change offered to the interception hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub component_id: String,
    /// `None` for a reset.
    pub value: Option<CommittedValue>,
    pub formatted: Option<FormattedRange>,
}

/// Final answer of an interception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Publish this value; usually the proposed one, possibly replaced.
    Proceed(Option<CommittedValue>),
    /// Veto. Local state keeps the change, nothing is published.
    Suppress,
}

/// What the interception hook returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interception {
    Decided(Decision),
    /// The host will answer later. The controller holds further commits until then.
    Defer,
}

impl Interception {
    pub fn proceed(value: Option<CommittedValue>) -> Self {
        Interception::Decided(Decision::Proceed(value))
    }

    pub fn suppress() -> Self {
        Interception::Decided(Decision::Suppress)
    }
}

/// Runs before a change becomes visible in the store.
pub trait BeforeValueChange: Send + Sync {
    fn intercept(&self, proposal: &Proposal) -> Interception;
}

impl<F> BeforeValueChange for F
where
    F: Fn(&Proposal) -> Interception + Send + Sync,
{
    fn intercept(&self, proposal: &Proposal) -> Interception {
        self(proposal)
    }
}

/// Runs after a change was published, with the formatted value.
pub trait OnValueChange: Send + Sync {
    fn changed(&self, value: Option<&FormattedRange>);
}

impl<F> OnValueChange for F
where
    F: Fn(Option<&FormattedRange>) + Send + Sync,
{
    fn changed(&self, value: Option<&FormattedRange>) {
        self(value)
    }
}
