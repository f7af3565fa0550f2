// ============================================================================
// shared-map - Component Module
// A minimal render host and the hooks that subscribe it to shared state
// ============================================================================

pub mod component;
pub mod hooks;
pub mod listener;

pub use component::{Component, ComponentInner};
pub use hooks::{current_component, use_hook, use_memo};
pub use listener::Listener;
