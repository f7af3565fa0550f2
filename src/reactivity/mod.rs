// ============================================================================
// shared-map - Reactivity Module
// Batching and synchronous notification scheduling
// ============================================================================

pub mod batching;
pub mod scheduling;

pub use batching::{batch, untrack};
pub use scheduling::{flush_sync, pending_count, schedule, schedule_all};
