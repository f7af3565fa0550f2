// ============================================================================
// shared-map - Map Options
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::state::{DebugEvent, DebugFn, StateOptions};

use super::element::Id;

/// Options for creating a [`SharedMap`](crate::SharedMap).
///
/// ```
/// use shared_map::MapOptions;
/// use serde_json::{json, Value};
///
/// let options: MapOptions<Value> = MapOptions::default()
///     .with_label("users")
///     .with_default_data([json!({ "id": 1 }), json!({ "id": 2 })]);
///
/// assert_eq!(options.debug_label.as_deref(), Some("users"));
/// assert_eq!(options.default_data.len(), 2);
/// ```
pub struct MapOptions<E> {
    /// Human-readable label, only used in diagnostics
    pub debug_label: Option<String>,

    /// Records the map starts with
    pub default_data: Vec<E>,

    /// Hook called with every successful change to the records
    pub debugger: Option<DebugFn<Id>>,
}

impl<E> MapOptions<E> {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.debug_label = Some(label.into());
        self
    }

    pub fn with_default_data(mut self, data: impl IntoIterator<Item = E>) -> Self {
        self.default_data = data.into_iter().collect();
        self
    }

    pub fn with_debugger(mut self, debugger: impl Fn(&DebugEvent<'_, Id>) + 'static) -> Self {
        self.debugger = Some(Rc::new(debugger));
        self
    }

    /// Options for the record state; the data is consumed separately.
    pub(crate) fn state_options(&self) -> StateOptions<Id> {
        StateOptions {
            debug_label: self.debug_label.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<E> Default for MapOptions<E> {
    fn default() -> Self {
        Self {
            debug_label: None,
            default_data: Vec::new(),
            debugger: None,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for MapOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("debug_label", &self.debug_label)
            .field("default_data", &self.default_data)
            .field("debugger", &self.debugger.is_some())
            .finish()
    }
}
