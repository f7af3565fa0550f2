// ============================================================================
// shared-map - Listener
// A plain callback subscriber for code that does not render
// ============================================================================

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::next_subscriber_id;
use crate::core::types::AnySubscriber;

/// Runs a callback every time one of its subscriptions is notified.
///
/// Notifications are coalesced like component renders: a listener runs at
/// most once per flush pass.
///
/// # Example
///
/// ```
/// use shared_map::{Listener, SharedMap};
/// use serde_json::{json, Value};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let todos: SharedMap<Value> = SharedMap::empty("id");
/// let changes = Rc::new(Cell::new(0));
///
/// let listener = Listener::new({
///     let changes = changes.clone();
///     move || changes.set(changes.get() + 1)
/// });
/// todos.register_list(&listener);
///
/// todos.add([json!({ "id": 1, "title": "write docs" })]).unwrap();
/// assert_eq!(changes.get(), 1);
/// ```
pub struct Listener {
    id: u64,
    flags: Cell<u32>,
    calls: Cell<usize>,
    callback: Box<dyn Fn()>,
}

impl Listener {
    /// Create a listener around `callback`.
    pub fn new(callback: impl Fn() + 'static) -> Rc<Self> {
        Rc::new(Self {
            id: next_subscriber_id(),
            flags: Cell::new(LISTENER | CLEAN),
            calls: Cell::new(0),
            callback: Box::new(callback),
        })
    }

    /// How many times the callback has run.
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

impl AnySubscriber for Listener {
    fn subscriber_id(&self) -> u64 {
        self.id
    }

    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn update(&self) {
        self.mark_clean();
        self.calls.set(self.calls.get() + 1);
        (self.callback)();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("calls", &self.calls.get())
            .finish()
    }
}
