// ============================================================================
// shared-map - Batching
// Coalesce writes to one or more maps into a single render pass
// ============================================================================
//
// Every SharedMap mutation already runs inside a batch, so a single add or
// reset renders each affected component once. `batch` extends that to a
// sequence of calls, possibly across several maps: notifications queue up
// until the outermost batch ends and then flush together.
// ============================================================================

use std::rc::Rc;

use crate::core::context::with_context;
use crate::core::types::AnySubscriber;
use crate::reactivity::scheduling::flush_sync;

// =============================================================================
// BATCH
// =============================================================================

/// Held while a batch is open; closing the outermost one flushes.
struct OpenBatch;

impl OpenBatch {
    fn enter() -> Self {
        with_context(|ctx| ctx.enter_batch());
        OpenBatch
    }
}

impl Drop for OpenBatch {
    fn drop(&mut self) {
        if with_context(|ctx| ctx.exit_batch()) == 0 {
            tracing::trace!("outermost batch closed");
            flush_sync();
        }
    }
}

/// Run `f` with notifications deferred, then flush them once.
///
/// Components touched by several writes inside `f` render a single time,
/// after `f` returns. Batches nest; only the outermost one flushes. The
/// batch is closed even when `f` panics.
///
/// # Example
///
/// ```
/// use shared_map::{batch, Listener, SharedMap};
/// use serde_json::{json, Value};
///
/// let todos: SharedMap<Value> = SharedMap::empty("id");
/// let done: SharedMap<Value> = SharedMap::empty("id");
///
/// let board = Listener::new(|| {});
/// todos.register_list(&board);
/// done.register_list(&board);
///
/// // Move a todo to the done column
/// todos.add([json!({ "id": 1, "title": "ship" })]).unwrap();
/// batch(|| {
///     todos.remove([1]).unwrap();
///     done.add([json!({ "id": 1, "title": "ship" })]).unwrap();
/// });
///
/// assert_eq!(board.call_count(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    let _open = OpenBatch::enter();
    f()
}

// =============================================================================
// UNTRACK
// =============================================================================

/// Restores the rendering component when dropped.
struct Detached {
    component: Option<Rc<dyn AnySubscriber>>,
}

impl Drop for Detached {
    fn drop(&mut self) {
        let component = self.component.take();
        with_context(|ctx| ctx.set_active_component(component));
    }
}

/// Read inside a render without subscribing the component.
///
/// Hooks called in `f` behave as if no component were rendering: they
/// return the current value and register nothing.
///
/// # Example
///
/// ```
/// use shared_map::{untrack, Component, SharedState, StateOptions};
/// use std::collections::HashMap;
///
/// let state: SharedState<&str, i32> =
///     SharedState::new(HashMap::from([("a", 1)]), StateOptions::default());
///
/// let view = Component::mount("peek", {
///     let state = state.clone();
///     move || {
///         let _ = untrack(|| state.use_prop(&"a"));
///     }
/// });
///
/// state.set_state([("a", Some(2))]).unwrap();
/// assert_eq!(view.render_count(), 1);
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    let _detached = Detached {
        component: with_context(|ctx| ctx.set_active_component(None)),
    };
    f()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Listener;
    use crate::core::context::{is_batching, is_rendering};
    use crate::state::{SharedState, StateOptions};
    use std::collections::HashMap;

    #[test]
    fn batch_passes_result_through() {
        assert_eq!(batch(|| "done"), "done");
    }

    #[test]
    fn only_outermost_batch_flushes() {
        let state: SharedState<&str, i32> = SharedState::new(HashMap::new(), StateOptions::default());
        let listener = Listener::new(|| {});
        state.register(&listener, None);

        batch(|| {
            batch(|| {
                state.set_state([("a", Some(1))]).unwrap();
            });
            assert!(is_batching());
            assert_eq!(listener.call_count(), 0);

            state.set_state([("b", Some(2))]).unwrap();
        });

        assert!(!is_batching());
        assert_eq!(listener.call_count(), 1);
    }

    #[test]
    fn panicking_batch_is_closed() {
        let result = std::panic::catch_unwind(|| batch::<()>(|| panic!("write failed")));

        assert!(result.is_err());
        assert!(!is_batching());
    }

    #[test]
    fn untrack_outside_render_just_runs() {
        assert_eq!(untrack(|| 7), 7);
        assert!(!is_rendering());
    }
}
