// ============================================================================
// shared-map - State Context
// Thread-local state for the rendering component, batching and id counters
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::types::AnySubscriber;

// =============================================================================
// STATE CONTEXT
// =============================================================================

/// Thread-local context holding all global state for notification scheduling.
///
/// Shared state handles are `Rc` based, so everything that coordinates them
/// lives on the owning thread as well.
pub struct StateContext {
    // =========================================================================
    // RENDER TRACKING
    // =========================================================================
    /// Component whose render function is currently executing
    pub active_component: RefCell<Option<Rc<dyn AnySubscriber>>>,

    // =========================================================================
    // BATCHING
    // =========================================================================
    /// Current batch depth (for nested batches)
    pub batch_depth: Cell<u32>,

    /// Subscribers notified since the last flush
    pub pending: RefCell<Vec<Weak<dyn AnySubscriber>>>,

    /// Whether a flush loop is currently running
    pub is_flushing: Cell<bool>,

    // =========================================================================
    // COUNTERS
    // =========================================================================
    /// Next subscriber id to hand out
    pub next_subscriber_id: Cell<u64>,

    /// Last list-version token value handed out
    pub update_counter: Cell<u64>,
}

impl StateContext {
    /// Create a new context with default values
    pub fn new() -> Self {
        Self {
            active_component: RefCell::new(None),
            batch_depth: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            is_flushing: Cell::new(false),
            next_subscriber_id: Cell::new(1),
            update_counter: Cell::new(0),
        }
    }

    // =========================================================================
    // RENDER TRACKING
    // =========================================================================

    /// Set the active component, returning the previous one
    pub fn set_active_component(
        &self,
        component: Option<Rc<dyn AnySubscriber>>,
    ) -> Option<Rc<dyn AnySubscriber>> {
        self.active_component.replace(component)
    }

    /// Get the active component
    pub fn get_active_component(&self) -> Option<Rc<dyn AnySubscriber>> {
        self.active_component.borrow().clone()
    }

    /// Check if a component is currently rendering
    pub fn has_active_component(&self) -> bool {
        self.active_component.borrow().is_some()
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    /// Get current batch depth
    pub fn get_batch_depth(&self) -> u32 {
        self.batch_depth.get()
    }

    /// Check if currently in a batch
    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Queue a notified subscriber for the next flush
    pub fn add_pending(&self, subscriber: Weak<dyn AnySubscriber>) {
        self.pending.borrow_mut().push(subscriber);
    }

    /// Take all pending subscribers
    pub fn take_pending(&self) -> Vec<Weak<dyn AnySubscriber>> {
        self.pending.replace(Vec::new())
    }

    /// Number of queued notifications
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Set flushing mode, returning previous
    pub fn set_flushing(&self, value: bool) -> bool {
        self.is_flushing.replace(value)
    }

    /// Check if a flush loop is running
    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    /// Allocate a fresh subscriber id
    pub fn allocate_subscriber_id(&self) -> u64 {
        let id = self.next_subscriber_id.get();
        self.next_subscriber_id.set(id + 1);
        id
    }

    /// Increment and return the update counter
    pub fn increment_update_counter(&self) -> u64 {
        let v = self.update_counter.get() + 1;
        self.update_counter.set(v);
        v
    }
}

impl Default for StateContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local state context
    static CONTEXT: StateContext = StateContext::new();
}

/// Access the thread-local state context.
///
/// # Example
///
/// ```ignore
/// with_context(|ctx| {
///     ctx.enter_batch();
/// });
/// ```
pub fn with_context<R>(f: impl FnOnce(&StateContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Check if a component render is in progress on this thread
pub fn is_rendering() -> bool {
    with_context(|ctx| ctx.has_active_component())
}

/// Check if currently in a batch
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

/// Check if a flush loop is running
pub fn is_flushing() -> bool {
    with_context(|ctx| ctx.is_flushing())
}

/// Allocate a fresh subscriber id
pub fn next_subscriber_id() -> u64 {
    with_context(|ctx| ctx.allocate_subscriber_id())
}

// =============================================================================
// TESTS
// =============================================================================
