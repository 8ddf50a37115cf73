//! Scripted controller runs.
//!
//! A scenario is a TOML file with a `[config]` table and an ordered list of
//! `[[events]]`:
//!
//! ```toml
//! intercept = "defer"
//!
//! [config]
//! component_id = "when"
//! data_field = "created"
//!
//! [[events]]
//! kind = "pick"
//! date = "2024-01-30"
//!
//! [[events]]
//! kind = "resolve"
//! decision = "proceed"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::Args;
use daterange_core::store::Publication;
use daterange_core::{
    CalendarView, CommittedValue, DateInput, DateRangeController, Decision, Event,
    ExternalRange, InMemoryStore, Interception, RangeConfig, RangeState, ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a TOML scenario
    path: PathBuf,
    /// Day the calendar falls back to when nothing is selected (yyyy-MM-dd)
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum InterceptMode {
    /// No before-change hook.
    #[default]
    None,
    Defer,
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ResolveDecision {
    Proceed,
    Suppress,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ScenarioEvent {
    Pick { date: DateInput },
    Reset,
    /// Replace `default_selected`; omit `start` to clear it.
    Default {
        start: Option<DateInput>,
        end: Option<DateInput>,
    },
    /// Another writer sets this controller's store value; omit both to clear.
    Store { start: Option<i64>, end: Option<i64> },
    Resolve { decision: ResolveDecision },
    ToggleModal,
    Unmount,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    intercept: InterceptMode,
    config: RangeConfig,
    #[serde(default)]
    events: Vec<ScenarioEvent>,
}

#[derive(Serialize)]
struct Report {
    events: Vec<Event>,
    publications: Vec<Publication>,
    state: RangeState,
    display_text: String,
    modal_visible: bool,
    awaiting_interception: bool,
    calendar: CalendarView,
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&args.path)?;
    let scenario: Scenario = toml::from_str(&content)?;
    scenario.config.validate()?;
    info!(path = %args.path.display(), events = scenario.events.len(), "running scenario");

    let store = Arc::new(InMemoryStore::new());
    let mut controller = DateRangeController::new(scenario.config, store.clone())?;
    controller = match scenario.intercept {
        InterceptMode::None => controller,
        InterceptMode::Defer => controller.with_before_value_change(|_| Interception::Defer),
        InterceptMode::Suppress => {
            controller.with_before_value_change(|_| Interception::suppress())
        }
    };
    controller.mount();

    for event in scenario.events {
        apply(&mut controller, &store, event)?;
    }

    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let report = Report {
        events: controller.drain_events(),
        publications: store.publications(),
        state: controller.state().clone(),
        display_text: controller.display_text(),
        modal_visible: controller.is_modal_visible(),
        awaiting_interception: controller.is_awaiting_interception(),
        calendar: controller.calendar_view(today),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn apply(
    controller: &mut DateRangeController<Arc<InMemoryStore>>,
    store: &InMemoryStore,
    event: ScenarioEvent,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        ScenarioEvent::Pick { date } => {
            let pick = date
                .to_pick()
                .ok_or_else(|| ValidationError::InvalidDate(format!("{date:?}")))?;
            controller.pick(pick);
        }
        ScenarioEvent::Reset => controller.reset(),
        ScenarioEvent::Default { start, end } => {
            let next = start.map(|start| ExternalRange {
                start: Some(start),
                end,
            });
            controller.update_default_selected(next);
        }
        ScenarioEvent::Store { start, end } => {
            let value = match (start, end) {
                (Some(start), Some(end)) => Some(CommittedValue::new(start, end)),
                _ => None,
            };
            store.set_value(&controller.config().component_id, value);
            controller.refresh_from_store();
        }
        ScenarioEvent::Resolve { decision } => {
            let decision = match decision {
                ResolveDecision::Proceed => {
                    Decision::Proceed(controller.pending_proposal().and_then(|p| p.value))
                }
                ResolveDecision::Suppress => Decision::Suppress,
            };
            controller.resolve_interception(decision)?;
        }
        ScenarioEvent::ToggleModal => controller.toggle_modal(),
        ScenarioEvent::Unmount => controller.unmount(),
    }
    Ok(())
}
