// ============================================================================
// shared-map - Type Definitions
// Type-erased subscriber traits shared by the state container and components
// ============================================================================

use std::any::Any;
use std::rc::{Rc, Weak};

use super::constants::*;

// =============================================================================
// TYPE-ERASED SUBSCRIBER
// =============================================================================
//
// The state container never needs to know what a subscriber is. It only
// stores Weak<dyn AnySubscriber> handles, marks them dirty and hands them to
// the scheduler. Components and listeners implement the trait; the hooks
// downcast back to the concrete component through as_any().
// =============================================================================

/// Type-erased interface for anything that can be notified of state changes.
///
/// Implemented by `ComponentInner` (re-renders) and `Listener` (runs a callback).
pub trait AnySubscriber: Any {
    /// Unique id for deduplication in registries and flush queues
    fn subscriber_id(&self) -> u64;

    /// Get the flags bitmask
    fn flags(&self) -> u32;

    /// Set the flags bitmask
    fn set_flags(&self, flags: u32);

    /// React to a flushed notification (re-render, run callback).
    fn update(&self);

    /// Upcast to Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Remember a state that subscribed this subscriber through a hook.
    ///
    /// Components release these before each render so that their hook
    /// subscriptions always match what the latest render read. Other
    /// subscribers ignore it.
    fn track(&self, _dependency: Weak<dyn AnyDependency>) {}

    /// Check if this subscriber is waiting for a flush
    fn is_dirty(&self) -> bool {
        self.flags() & DIRTY != 0
    }

    /// Check if this subscriber is clean
    fn is_clean(&self) -> bool {
        self.flags() & CLEAN != 0
    }

    /// Check if this subscriber is a component currently rendering
    fn is_rendering(&self) -> bool {
        self.flags() & RENDERING != 0
    }

    /// Check if this subscriber has been unmounted
    fn is_unmounted(&self) -> bool {
        self.flags() & UNMOUNTED != 0
    }

    /// Mark as dirty (clear status bits, set DIRTY)
    fn mark_dirty(&self) {
        let flags = (self.flags() & STATUS_MASK) | DIRTY;
        self.set_flags(flags);
    }

    /// Mark as clean (clear status bits, set CLEAN)
    fn mark_clean(&self) {
        let flags = (self.flags() & STATUS_MASK) | CLEAN;
        self.set_flags(flags);
    }
}

// =============================================================================
// TYPE-ERASED DEPENDENCY
// =============================================================================

/// A state a component subscribed to while rendering.
pub trait AnyDependency {
    /// Drop the hook-made subscription of `subscriber_id`.
    ///
    /// Subscriptions made through an explicit `register` call are kept.
    fn release(&self, subscriber_id: u64);
}

// =============================================================================
// SUBSCRIBE
// =============================================================================

/// Anything that can hand out a shared subscriber handle.
///
/// Lets registration APIs accept `&Component` and `&Rc<Listener>` alike.
pub trait Subscribe {
    /// Get the type-erased subscriber
    fn as_subscriber(&self) -> Rc<dyn AnySubscriber>;
}

impl<S: AnySubscriber> Subscribe for Rc<S> {
    fn as_subscriber(&self) -> Rc<dyn AnySubscriber> {
        self.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
