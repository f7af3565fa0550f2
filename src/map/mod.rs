// ============================================================================
// shared-map - Map Module
// Keyed record collections built on two shared states
// ============================================================================

mod element;
mod options;
mod shared_map;

pub use element::{Element, Id};
pub use options::MapOptions;
pub use shared_map::{ListView, SharedMap};
