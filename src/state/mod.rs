// ============================================================================
// shared-map - State Module
// The observable state container and list-version tokens
// ============================================================================

pub mod shared_state;
pub mod token;

pub use shared_state::{Changes, DebugEvent, DebugFn, DebugKind, SharedState, StateOptions};
pub use token::UpdateToken;
