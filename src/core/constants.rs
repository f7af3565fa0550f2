// ============================================================================
// shared-map - Constants
// Subscriber status flags and well-known state keys
// ============================================================================

// =============================================================================
// SUBSCRIBER KIND FLAGS
// =============================================================================

/// Subscriber is a mounted component with a render function
pub const COMPONENT: u32 = 1 << 0;

/// Subscriber is a plain callback listener
pub const LISTENER: u32 = 1 << 1;

// =============================================================================
// SUBSCRIBER STATE FLAGS
// =============================================================================

/// Subscriber is up-to-date
pub const CLEAN: u32 = 1 << 10;

/// Subscriber has been notified and is waiting for the next flush
pub const DIRTY: u32 = 1 << 11;

/// Component is currently inside its render function
pub const RENDERING: u32 = 1 << 12;

/// Component has been unmounted; notifications are ignored
pub const UNMOUNTED: u32 = 1 << 13;

/// Mask to clear CLEAN/DIRTY before setting a new status
pub const STATUS_MASK: u32 = !(CLEAN | DIRTY);

// =============================================================================
// SCHEDULING
// =============================================================================

/// Maximum flush passes before we consider it an infinite update loop
pub const MAX_FLUSH_COUNT: u32 = 1000;

// =============================================================================
// WELL-KNOWN KEYS
// =============================================================================

/// Key of the list-version token inside a map's update state
pub const UPDATE_ID: &str = "updateId";

/// Name attached to every classified state error
pub const STATE_ERROR_NAME: &str = "State Error";

// =============================================================================
// TESTS
// =============================================================================
