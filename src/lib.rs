// ============================================================================
// shared-map - Keyed Reactive Collections for UI Components
// ============================================================================
//
// A SharedMap stores uniquely-keyed records on top of a small observable
// state container. Components subscribe either to one record (use_element)
// or to the list as a whole (use_list, register_list), so a list view does
// not re-render on every field change of a record it only counts.
// ============================================================================

#[macro_use]
mod macros;

pub mod component;
pub mod core;
pub mod map;
pub mod reactivity;
pub mod state;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{is_batching, is_flushing, is_rendering, with_context, StateContext};
pub use crate::core::error::{ContainerError, ErrorCode, ErrorDescriptor, Severity, StateError};
pub use crate::core::types::{AnyDependency, AnySubscriber, Subscribe};

// Re-export the collection (the main entry point)
pub use map::{Element, Id, ListView, MapOptions, SharedMap};

// Re-export the state container
pub use state::{Changes, DebugEvent, DebugFn, DebugKind, SharedState, StateOptions, UpdateToken};

// Re-export the component host and hooks
pub use component::{current_component, use_hook, use_memo, Component, Listener};

// Re-export scheduling functions
pub use reactivity::{batch, flush_sync, untrack};

// =============================================================================
// TESTS
// =============================================================================
