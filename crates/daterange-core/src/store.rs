//! Selection store interface.
//!
//! The store holds every controller's published value and query, keyed by
//! component id. A controller owns its own key and only reads the keys of the
//! controllers it depends on.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::range::CommittedValue;

/// Called with `(previous, next)` when a component's query changes.
pub type QueryChangeFn = Arc<dyn Fn(Option<&Value>, Option<&Value>) + Send + Sync>;

/// Which other controllers' filters a controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    Component(String),
    Components(Vec<DependencySpec>),
    Clause(DependencyClause),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyClause {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Box<DependencySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Box<DependencySpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<DependencySpec>>,
}

impl DependencySpec {
    /// Every component id mentioned, in order, without duplicates.
    pub fn component_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect(&self, out: &mut Vec<String>) {
        match self {
            DependencySpec::Component(id) => {
                if !out.contains(id) {
                    out.push(id.clone());
                }
            }
            DependencySpec::Components(specs) => specs.iter().for_each(|s| s.collect(out)),
            DependencySpec::Clause(clause) => {
                for part in [&clause.and, &clause.or, &clause.not].into_iter().flatten() {
                    part.collect(out);
                }
            }
        }
    }
}

/// A new value and query for one component.
#[derive(Clone)]
pub struct QueryUpdate {
    pub component_id: String,
    pub query: Option<Value>,
    pub value: Option<CommittedValue>,
    pub show_filter: bool,
    pub label: String,
    pub on_query_change: Option<QueryChangeFn>,
    pub persist_in_url: bool,
}

impl fmt::Debug for QueryUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryUpdate")
            .field("component_id", &self.component_id)
            .field("query", &self.query)
            .field("value", &self.value)
            .field("show_filter", &self.show_filter)
            .field("label", &self.label)
            .field("on_query_change", &self.on_query_change.is_some())
            .field("persist_in_url", &self.persist_in_url)
            .finish()
    }
}

/// What a controller needs from the shared store.
pub trait SelectionStore: Send + Sync {
    fn register(&self, component_id: &str);

    fn unregister(&self, component_id: &str);

    /// Subscribe `component_id` to the filters of its dependencies.
    fn watch(&self, component_id: &str, dependencies: &DependencySpec);

    /// Current externally held value for `component_id`.
    fn read(&self, component_id: &str) -> Option<CommittedValue>;

    fn publish(&self, update: QueryUpdate);
}

impl<S: SelectionStore + ?Sized> SelectionStore for Arc<S> {
    fn register(&self, component_id: &str) {
        (**self).register(component_id)
    }

    fn unregister(&self, component_id: &str) {
        (**self).unregister(component_id)
    }

    fn watch(&self, component_id: &str, dependencies: &DependencySpec) {
        (**self).watch(component_id, dependencies)
    }

    fn read(&self, component_id: &str) -> Option<CommittedValue> {
        (**self).read(component_id)
    }

    fn publish(&self, update: QueryUpdate) {
        (**self).publish(update)
    }
}

/// A published filter as held by [`InMemoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedEntry {
    pub value: Option<CommittedValue>,
    pub query: Option<Value>,
    pub show_filter: bool,
    pub label: String,
    pub persist_in_url: bool,
}

/// One entry of the publication log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub component_id: String,
    #[serde(flatten)]
    pub entry: SelectedEntry,
}

#[derive(Default)]
struct StoreState {
    components: BTreeSet<String>,
    watches: BTreeMap<String, DependencySpec>,
    selected: BTreeMap<String, SelectedEntry>,
    log: Vec<Publication>,
}

/// Process-local store, shareable between controllers through `Arc`.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // Entries are replaced whole, so a poisoned guard still holds consistent data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a value as if some other writer (e.g. URL restore) had set it.
    pub fn set_value(&self, component_id: &str, value: Option<CommittedValue>) {
        let mut state = self.state();
        let entry = state
            .selected
            .entry(component_id.to_string())
            .or_insert_with(|| SelectedEntry {
                value: None,
                query: None,
                show_filter: true,
                label: component_id.to_string(),
                persist_in_url: false,
            });
        entry.value = value;
    }

    pub fn is_registered(&self, component_id: &str) -> bool {
        self.state().components.contains(component_id)
    }

    pub fn dependencies(&self, component_id: &str) -> Option<DependencySpec> {
        self.state().watches.get(component_id).cloned()
    }

    pub fn entry(&self, component_id: &str) -> Option<SelectedEntry> {
        self.state().selected.get(component_id).cloned()
    }

    pub fn query(&self, component_id: &str) -> Option<Value> {
        self.entry(component_id).and_then(|e| e.query)
    }

    /// Every publication so far, oldest first.
    pub fn publications(&self) -> Vec<Publication> {
        self.state().log.clone()
    }

    /// Active filters: published entries with a value and `show_filter`.
    pub fn active_filters(&self) -> BTreeMap<String, SelectedEntry> {
        self.state()
            .selected
            .iter()
            .filter(|(_, e)| e.value.is_some() && e.show_filter)
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect()
    }

    /// Components that declared a dependency on `component_id`.
    pub fn dependents_of(&self, component_id: &str) -> Vec<String> {
        self.state()
            .watches
            .iter()
            .filter(|(_, spec)| spec.component_ids().iter().any(|id| id == component_id))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

impl SelectionStore for InMemoryStore {
    fn register(&self, component_id: &str) {
        debug!(component_id, "register");
        self.state().components.insert(component_id.to_string());
    }

    fn unregister(&self, component_id: &str) {
        debug!(component_id, "unregister");
        let mut state = self.state();
        state.components.remove(component_id);
        state.watches.remove(component_id);
        state.selected.remove(component_id);
    }

    fn watch(&self, component_id: &str, dependencies: &DependencySpec) {
        debug!(component_id, ?dependencies, "watch");
        self.state()
            .watches
            .insert(component_id.to_string(), dependencies.clone());
    }

    fn read(&self, component_id: &str) -> Option<CommittedValue> {
        self.state()
            .selected
            .get(component_id)
            .and_then(|e| e.value)
    }

    fn publish(&self, update: QueryUpdate) {
        let QueryUpdate {
            component_id,
            query,
            value,
            show_filter,
            label,
            on_query_change,
            persist_in_url,
        } = update;

        let entry = SelectedEntry {
            value,
            query,
            show_filter,
            label,
            persist_in_url,
        };

        let previous_query = {
            let mut state = self.state();
            let previous = state
                .selected
                .insert(component_id.clone(), entry.clone())
                .and_then(|e| e.query);
            state.log.push(Publication {
                component_id: component_id.clone(),
                entry: entry.clone(),
            });
            previous
        };

        // Outside the lock: the callback may read the store.
        if previous_query != entry.query {
            if let Some(cb) = on_query_change {
                cb(previous_query.as_ref(), entry.query.as_ref());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn update(id: &str, value: Option<CommittedValue>, query: Option<Value>) -> QueryUpdate {
        QueryUpdate {
            component_id: id.into(),
            query,
            value,
            show_filter: true,
            label: id.into(),
            on_query_change: None,
            persist_in_url: false,
        }
    }

    #[test]
    fn register_and_unregister() {
        let store = InMemoryStore::new();
        store.register("when");
        assert!(store.is_registered("when"));
        store.publish(update("when", Some(CommittedValue::new(1, 2)), None));
        store.unregister("when");
        assert!(!store.is_registered("when"));
        assert!(store.read("when").is_none());
    }

    #[test]
    fn publish_then_read() {
        let store = InMemoryStore::new();
        let value = CommittedValue::new(1, 2);
        store.publish(update("when", Some(value), Some(serde_json::json!({"q": 1}))));
        assert_eq!(store.read("when"), Some(value));
        assert_eq!(store.query("when"), Some(serde_json::json!({"q": 1})));
        assert_eq!(store.publications().len(), 1);
        assert_eq!(store.active_filters().len(), 1);
    }

    #[test]
    fn query_change_fires_only_on_change() {
        let store = InMemoryStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cb: QueryChangeFn = Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut u = update("when", None, Some(serde_json::json!({"q": 1})));
        u.on_query_change = Some(cb.clone());
        store.publish(u.clone());
        store.publish(u);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut u = update("when", None, None);
        u.on_query_change = Some(cb);
        store.publish(u);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dependency_spec_flattens() {
        let spec: DependencySpec = serde_json::from_str(
            r#"{ "and": ["city", { "or": "venue" }], "not": "city" }"#,
        )
        .unwrap();
        assert_eq!(spec.component_ids(), vec!["city".to_string(), "venue".to_string()]);

        let single: DependencySpec = serde_json::from_str("\"city\"").unwrap();
        assert_eq!(single, DependencySpec::Component("city".into()));
    }

    #[test]
    fn watch_records_dependents() {
        let store = InMemoryStore::new();
        store.watch("when", &DependencySpec::Component("city".into()));
        assert_eq!(store.dependents_of("city"), vec!["when".to_string()]);
        assert!(store.dependents_of("when").is_empty());
    }
}
