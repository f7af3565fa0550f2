// ============================================================================
// shared-map - Core Module
// Subscriber traits, thread-local context, and error types
// ============================================================================

pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use context::{is_batching, is_flushing, is_rendering, with_context, StateContext};
pub use error::{ContainerError, ErrorCode, ErrorDescriptor, Severity, StateError};
pub use types::{AnyDependency, AnySubscriber, Subscribe};
