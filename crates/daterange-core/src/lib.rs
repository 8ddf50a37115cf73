//! # DateRange Core Library
//!
//! Selection logic for a calendar date range filter. A user picks a start and
//! an end day; the controller turns the pair into a backend filter query and
//! keeps it in sync with a shared selection store.
//!
//! ## Architecture
//!
//! - **Range state machine**: a pure transition function over
//!   `Empty | Pending | Committed`
//! - **Query builder**: committed range + field configuration to a JSON filter
//! - **Markings**: calendar cells tagged start / in-range / end
//! - **Controller**: store registration, seeding from external values,
//!   interception hooks and publication
//!
//! ## Key Components
//!
//! - [`DateRangeController`]: owns the selection and talks to the store
//! - [`RangeState`]: the selection itself
//! - [`SelectionStore`]: what the controller needs from the shared store
//! - [`RangeConfig`]: host-facing options

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod format;
pub mod hooks;
pub mod marking;
pub mod query;
pub mod range;
pub mod store;

pub use config::{DateInput, ExternalRange, RangeConfig};
pub use controller::DateRangeController;
pub use error::{ConfigError, CoreError, Result, ValidationError};
pub use events::Event;
pub use format::{format_date, format_timestamp, FormattedDate, QueryFormat};
pub use hooks::{Decision, FormattedRange, Interception, Proposal};
pub use marking::{compute_markings, CalendarView, Marking, MarkingRole, MarkingType, Markings};
pub use query::{build_query, CustomQuery, FieldConfig};
pub use range::{CommittedValue, DatePick, RangeState};
pub use store::{DependencySpec, InMemoryStore, QueryUpdate, SelectionStore};
