// ============================================================================
// shared-map - Notification Scheduling
// Queues notified subscribers and flushes them synchronously
// ============================================================================
//
// There is no event loop to defer to, so notifications flush right away
// unless a batch (or an in-progress flush) is open. Each subscriber runs at
// most once per flush pass no matter how many keys it was notified for.
// ============================================================================

use std::collections::HashSet;
use std::rc::Rc;

use crate::core::constants::MAX_FLUSH_COUNT;
use crate::core::context::with_context;
use crate::core::types::AnySubscriber;

// =============================================================================
// SCHEDULE
// =============================================================================

/// Mark a subscriber dirty and queue it for the next flush.
///
/// Flushes immediately when no batch is open and no flush is running.
/// Unmounted subscribers are ignored.
pub fn schedule(subscriber: &Rc<dyn AnySubscriber>) {
    if subscriber.is_unmounted() {
        return;
    }

    subscriber.mark_dirty();
    with_context(|ctx| ctx.add_pending(Rc::downgrade(subscriber)));

    let should_flush = with_context(|ctx| !ctx.is_batching() && !ctx.is_flushing());

    if should_flush {
        flush_sync();
    }
}

/// Queue several subscribers, flushing once at the end.
pub fn schedule_all(subscribers: &[Rc<dyn AnySubscriber>]) {
    if subscribers.is_empty() {
        return;
    }

    with_context(|ctx| ctx.enter_batch());

    struct ScheduleGuard;

    impl Drop for ScheduleGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());
            if depth == 0 {
                flush_sync();
            }
        }
    }

    let _guard = ScheduleGuard;
    for subscriber in subscribers {
        schedule(subscriber);
    }
}

// =============================================================================
// FLUSH SYNC
// =============================================================================

/// Synchronously run every pending subscriber.
///
/// Keeps flushing until no subscriber is pending. Subscribers notified while
/// the flush runs are picked up by the next pass.
///
/// # Panics
///
/// Panics after `MAX_FLUSH_COUNT` passes, which means some subscriber keeps
/// writing to state it is subscribed to.
pub fn flush_sync() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));

    // Nested calls leave the work to the outer loop
    if was_flushing {
        return;
    }

    struct FlushGuard;

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing(false));
        }
    }

    let _guard = FlushGuard;
    let mut flush_count = 0u32;

    loop {
        let pending = with_context(|ctx| ctx.take_pending());

        if pending.is_empty() {
            break;
        }

        flush_count += 1;
        if flush_count > MAX_FLUSH_COUNT {
            panic!(
                "Maximum update depth exceeded. This can happen when a component \
                 keeps writing to state it renders from. Check for mutations made \
                 during render without proper guards."
            );
        }

        tracing::trace!(pass = flush_count, pending = pending.len(), "flushing subscribers");

        let mut seen = HashSet::with_capacity(pending.len());

        for weak in pending {
            let Some(subscriber) = weak.upgrade() else {
                continue;
            };

            if !seen.insert(subscriber.subscriber_id()) {
                continue;
            }

            if subscriber.is_unmounted() || !subscriber.is_dirty() {
                continue;
            }

            subscriber.update();
        }
    }
}

/// Number of subscribers waiting for a flush.
pub fn pending_count() -> usize {
    with_context(|ctx| ctx.pending_count())
}

// =============================================================================
// TESTS
// =============================================================================
