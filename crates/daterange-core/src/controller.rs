//! Date range controller.
//!
//! Owns one [`RangeState`] and keeps it in step with the selection store.
//! User picks, resets and external values all go through one input queue and
//! one transition function, so a range committed from a default value behaves
//! exactly like one picked by hand.
//!
//! ## Lifecycle
//!
//! ```text
//! new -> mount (register, watch, seed) -> picks / resets / syncs -> unmount
//! ```
//!
//! ## Interception
//!
//! A commit first goes to the `before_value_change` hook. If the hook defers,
//! the controller is *awaiting interception*: new input is queued in arrival
//! order and replayed once [`DateRangeController::resolve_interception`] is
//! called. A reset queued meanwhile supersedes the deferred value.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{ExternalRange, RangeConfig};
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::hooks::{
    BeforeValueChange, Decision, FormattedRange, Interception, OnValueChange, Proposal,
};
use crate::marking::{compute_markings, CalendarView, Markings};
use crate::query::{build_query, CustomQuery};
use crate::range::{CommittedValue, DatePick, RangeState, Transition};
use crate::store::{DependencySpec, QueryChangeFn, QueryUpdate, SelectionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Pick(DatePick),
    Reset,
}

#[derive(Default, Clone)]
struct Hooks {
    before_value_change: Option<Arc<dyn BeforeValueChange>>,
    on_value_change: Option<Arc<dyn OnValueChange>>,
    custom_query: Option<Arc<dyn CustomQuery>>,
    on_query_change: Option<QueryChangeFn>,
}

/// Selection controller for one date range filter.
pub struct DateRangeController<S: SelectionStore> {
    config: RangeConfig,
    store: S,
    state: RangeState,
    hooks: Hooks,
    /// Commit waiting on a deferred interception.
    awaiting: Option<Proposal>,
    queue: VecDeque<Input>,
    /// Store value as last observed or written by this controller.
    last_selected: Option<CommittedValue>,
    modal_visible: bool,
    mounted: bool,
    events: Vec<Event>,
}

impl<S: SelectionStore> DateRangeController<S> {
    /// Create an unmounted controller.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(config: RangeConfig, store: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            state: RangeState::Empty,
            hooks: Hooks::default(),
            awaiting: None,
            queue: VecDeque::new(),
            last_selected: None,
            modal_visible: false,
            mounted: false,
            events: Vec::new(),
        })
    }

    pub fn with_before_value_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Proposal) -> Interception + Send + Sync + 'static,
    {
        self.hooks.before_value_change = Some(Arc::new(hook));
        self
    }

    pub fn with_on_value_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&FormattedRange>) + Send + Sync + 'static,
    {
        self.hooks.on_value_change = Some(Arc::new(hook));
        self
    }

    /// Replace the default query builder.
    pub fn with_custom_query<F>(mut self, builder: F) -> Self
    where
        F: Fn(Option<&CommittedValue>, &RangeConfig) -> Option<Value> + Send + Sync + 'static,
    {
        self.hooks.custom_query = Some(Arc::new(builder));
        self
    }

    pub fn with_on_query_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.hooks.on_query_change = Some(Arc::new(hook));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> &RangeState {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_awaiting_interception(&self) -> bool {
        self.awaiting.is_some()
    }

    /// The change a deferred interception is holding, if any.
    pub fn pending_proposal(&self) -> Option<&Proposal> {
        self.awaiting.as_ref()
    }

    /// Number of inputs held back by a deferred interception.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_modal_visible(&self) -> bool {
        self.modal_visible
    }

    pub fn markings(&self) -> Markings {
        compute_markings(&self.state)
    }

    /// What the calendar should render. Opens on the selection start, else
    /// the configured `start_date`, else `today`.
    pub fn calendar_view(&self, today: NaiveDate) -> CalendarView {
        let fallback = self
            .config
            .start_date
            .as_ref()
            .and_then(|d| d.resolve())
            .map(|dt| dt.date_naive())
            .unwrap_or(today);
        CalendarView::new(&self.state, fallback)
    }

    /// Text for the picker field: the selection, or the placeholder.
    pub fn display_text(&self) -> String {
        self.state
            .describe()
            .unwrap_or_else(|| self.config.placeholder.clone())
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Register with the store, watch dependencies and seed the initial value.
    ///
    /// A value already held by the store wins over `default_selected`.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        let id = self.config.component_id.clone();
        self.store.register(&id);
        if let Some(react) = &self.config.react {
            self.store.watch(&id, react);
        }
        self.mounted = true;
        self.events.push(Event::Mounted {
            component_id: id.clone(),
            at: Utc::now(),
        });
        info!(component_id = %id, "mounted");

        let selected = self.store.read(&id);
        self.last_selected = selected;
        let seed = selected
            .map(ExternalRange::from)
            .or_else(|| self.config.default_selected.clone());
        if let Some(seed) = seed {
            self.seed(Some(&seed));
        }
    }

    /// Deregister from the store and drop all local selection state.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        let id = self.config.component_id.clone();
        self.store.unregister(&id);
        self.state = RangeState::Empty;
        self.awaiting = None;
        self.queue.clear();
        self.last_selected = None;
        self.modal_visible = false;
        self.mounted = false;
        self.events.push(Event::Unmounted {
            component_id: id.clone(),
            at: Utc::now(),
        });
        info!(component_id = %id, "unmounted");
    }

    // ── Input ────────────────────────────────────────────────────────

    /// A day tapped on the calendar.
    pub fn pick(&mut self, pick: DatePick) {
        self.submit(Input::Pick(pick));
    }

    /// Clear the selection and publish `None`.
    pub fn reset(&mut self) {
        self.submit(Input::Reset);
    }

    pub fn toggle_modal(&mut self) {
        self.modal_visible = !self.modal_visible;
    }

    /// Apply a new `default_selected`. Re-seeds only if it differs by value.
    pub fn update_default_selected(&mut self, next: Option<ExternalRange>) {
        self.sync(next);
    }

    /// Re-read this controller's value from the store and re-seed if another
    /// writer changed it.
    pub fn refresh_from_store(&mut self) {
        let current = self.config.default_selected.clone();
        self.sync(current);
    }

    /// Apply a host update: a possibly new default plus whatever the store
    /// now holds. A changed default wins over a changed store value.
    ///
    /// Before mount only the default is recorded; mount seeds from it.
    pub fn sync(&mut self, next_default: Option<ExternalRange>) {
        if !self.mounted {
            debug!(component_id = %self.config.component_id, "not mounted, recording default only");
            self.config.default_selected = next_default;
            return;
        }
        let selected = self.store.read(&self.config.component_id);
        let default_changed = next_default != self.config.default_selected;
        let selected_changed = selected != self.last_selected;
        self.last_selected = selected;

        if default_changed {
            self.config.default_selected = next_default;
            let seed = self.config.default_selected.clone();
            self.seed(seed.as_ref());
        } else if selected_changed && selected != self.state.committed_value() {
            self.seed(selected.map(ExternalRange::from).as_ref());
        }
    }

    /// Watch a new dependency set if it changed.
    pub fn update_react(&mut self, next: Option<DependencySpec>) {
        if next == self.config.react {
            return;
        }
        self.config.react = next;
        if let Some(react) = &self.config.react {
            if self.mounted {
                self.store.watch(&self.config.component_id, react);
            }
        }
    }

    /// Answer a deferred interception and replay queued input.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoPendingInterception`] if nothing is waiting.
    pub fn resolve_interception(&mut self, decision: Decision) -> Result<()> {
        let proposal = self
            .awaiting
            .take()
            .ok_or_else(|| CoreError::NoPendingInterception {
                component_id: self.config.component_id.clone(),
            })?;

        if self.queue.contains(&Input::Reset) {
            debug!(component_id = %self.config.component_id, "deferred value superseded by reset");
            self.events.push(Event::InterceptionSuperseded {
                value: proposal.value,
                at: Utc::now(),
            });
        } else {
            self.finish_commit(&proposal, decision);
        }
        self.drain();
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Feed an external value through the picker: start, then end if present.
    /// A missing or malformed value clears the selection.
    fn seed(&mut self, external: Option<&ExternalRange>) {
        let start = external.and_then(|r| r.start.as_ref());
        let Some(start) = start.and_then(|s| s.to_pick()) else {
            if external.is_some() {
                warn!(component_id = %self.config.component_id, ?external, "ignoring external range without a valid start");
            }
            if !self.state.is_empty() || self.awaiting.is_some() {
                self.submit(Input::Reset);
            }
            return;
        };

        let end = match external.and_then(|r| r.end.as_ref()) {
            Some(input) => {
                let pick = input.to_pick();
                if pick.is_none() {
                    warn!(component_id = %self.config.component_id, ?input, "ignoring malformed external end date");
                }
                pick
            }
            None => None,
        };

        self.events.push(Event::Seeded {
            start: Some(start.timestamp),
            end: end.as_ref().map(|e| e.timestamp),
            at: Utc::now(),
        });
        self.queue.push_back(Input::Pick(start));
        if let Some(end) = end {
            self.queue.push_back(Input::Pick(end));
        }
        self.drain();
    }

    fn submit(&mut self, input: Input) {
        if !self.mounted {
            debug!(component_id = %self.config.component_id, ?input, "not mounted, ignoring input");
            return;
        }
        self.queue.push_back(input);
        self.drain();
    }

    /// Apply queued input in order until empty or an interception defers.
    fn drain(&mut self) {
        while self.awaiting.is_none() {
            let Some(input) = self.queue.pop_front() else {
                break;
            };
            self.apply(input);
        }
    }

    fn apply(&mut self, input: Input) {
        let pick = match input {
            Input::Pick(p) => Some(p),
            Input::Reset => None,
        };
        let previous = std::mem::take(&mut self.state);
        let Transition { state, commit } = previous.transition(pick);
        self.state = state;

        let at = Utc::now();
        match &self.state {
            RangeState::Empty => self.events.push(Event::RangeReset { at }),
            RangeState::Pending { start } => {
                debug!(component_id = %self.config.component_id, start = %start.date_string, "range started");
                self.events.push(Event::RangeStarted {
                    start: start.clone(),
                    at,
                });
            }
            RangeState::Committed { start, end } => {
                debug!(
                    component_id = %self.config.component_id,
                    start = %start.date_string,
                    end = %end.date_string,
                    "range committed"
                );
                self.events.push(Event::RangeCommitted {
                    start: start.clone(),
                    end: end.clone(),
                    at,
                });
            }
        }

        if let Some(commit) = commit {
            self.begin_commit(commit.value);
        }
    }

    fn begin_commit(&mut self, value: Option<CommittedValue>) {
        let proposal = Proposal {
            component_id: self.config.component_id.clone(),
            value,
            formatted: value.map(|v| FormattedRange::new(&v, &self.config.query_format)),
        };
        let interception = match &self.hooks.before_value_change {
            Some(hook) => hook.intercept(&proposal),
            None => Interception::proceed(value),
        };

        match interception {
            Interception::Decided(decision) => self.finish_commit(&proposal, decision),
            Interception::Defer => {
                debug!(component_id = %self.config.component_id, ?value, "interception deferred");
                self.events.push(Event::InterceptionDeferred {
                    value,
                    at: Utc::now(),
                });
                self.awaiting = Some(proposal);
            }
        }
    }

    fn finish_commit(&mut self, proposal: &Proposal, decision: Decision) {
        match decision {
            Decision::Suppress => {
                warn!(component_id = %proposal.component_id, value = ?proposal.value, "value change rejected by before_value_change");
                self.events.push(Event::ValueSuppressed {
                    value: proposal.value,
                    at: Utc::now(),
                });
            }
            Decision::Proceed(value) => {
                self.publish(value);
                if let Some(hook) = &self.hooks.on_value_change {
                    let formatted =
                        value.map(|v| FormattedRange::new(&v, &self.config.query_format));
                    hook.changed(formatted.as_ref());
                }
            }
        }
    }

    fn publish(&mut self, value: Option<CommittedValue>) {
        let query = match &self.hooks.custom_query {
            Some(builder) => builder.build(value.as_ref(), &self.config),
            None => build_query(
                value.as_ref(),
                &self.config.data_field,
                &self.config.query_format,
            ),
        };

        self.store.publish(QueryUpdate {
            component_id: self.config.component_id.clone(),
            query: query.clone(),
            value,
            show_filter: self.config.show_filter,
            label: self.config.label().to_string(),
            on_query_change: self.hooks.on_query_change.clone(),
            persist_in_url: self.config.persist_in_url,
        });
        self.last_selected = value;
        info!(component_id = %self.config.component_id, ?value, "published");
        self.events.push(Event::ValuePublished {
            value,
            query,
            at: Utc::now(),
        });
    }
}
