// ============================================================================
// shared-map - SharedState
// A keyed observable container with key-scoped subscriptions
// ============================================================================
//
// Storage is a plain HashMap behind a RefCell. Subscribers register either
// for a set of keys or for everything; a write notifies only the
// registrations whose keys intersect the changed keys. Subscribers are held
// weakly, so dropping a component or listener is enough to detach it.
// ============================================================================

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use crate::core::context::with_context;
use crate::core::error::ContainerError;
use crate::core::types::{AnyDependency, AnySubscriber, Subscribe};
use crate::reactivity::scheduling::schedule_all;

// =============================================================================
// CHANGES & DIAGNOSTICS
// =============================================================================

/// Entries that actually changed in a write.
///
/// `(key, Some(value))` was inserted or overwritten, `(key, None)` was removed.
pub type Changes<K, V> = Vec<(K, Option<V>)>;

/// What kind of write produced a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugKind {
    /// Merge-style partial update
    Update,
    /// Whole-state replacement
    Replace,
    /// Forced re-notification without a data change
    Refresh,
}

/// Diagnostic event passed to a state's debugger hook.
#[derive(Debug)]
pub struct DebugEvent<'a, K> {
    /// Debug label of the state, if any
    pub label: Option<&'a str>,
    /// The kind of write
    pub kind: DebugKind,
    /// Keys involved; empty together with `all` for a global refresh
    pub keys: &'a [K],
    /// Whether every subscriber was notified
    pub all: bool,
}

/// Debugger hook invoked after every successful change.
pub type DebugFn<K> = Rc<dyn Fn(&DebugEvent<'_, K>)>;

// =============================================================================
// OPTIONS
// =============================================================================

/// Options for creating a [`SharedState`].
pub struct StateOptions<K> {
    /// Human-readable label, only used in diagnostics
    pub debug_label: Option<String>,

    /// Hook called with every successful change
    pub debugger: Option<DebugFn<K>>,
}

impl<K> StateOptions<K> {
    /// Set the debug label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.debug_label = Some(label.into());
        self
    }

    /// Set the debugger hook
    pub fn with_debugger(mut self, debugger: impl Fn(&DebugEvent<'_, K>) + 'static) -> Self {
        self.debugger = Some(Rc::new(debugger));
        self
    }
}

impl<K> Default for StateOptions<K> {
    fn default() -> Self {
        Self {
            debug_label: None,
            debugger: None,
        }
    }
}

impl<K> Clone for StateOptions<K> {
    fn clone(&self) -> Self {
        Self {
            debug_label: self.debug_label.clone(),
            debugger: self.debugger.clone(),
        }
    }
}

impl<K> Debug for StateOptions<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateOptions")
            .field("debug_label", &self.debug_label)
            .field("debugger", &self.debugger.is_some())
            .finish()
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

struct Registration<K> {
    id: u64,
    subscriber: Weak<dyn AnySubscriber>,
    /// `None` means "every key"
    keys: Option<HashSet<K>>,
    /// Made by a hook during a render, released before the next one
    tracked: bool,
}

impl<K: Eq + Hash> Registration<K> {
    fn matches(&self, changed: Option<&[K]>) -> bool {
        match (changed, &self.keys) {
            (None, _) | (_, None) => true,
            (Some(changed), Some(keys)) => changed.iter().any(|k| keys.contains(k)),
        }
    }
}

// =============================================================================
// SHARED STATE
// =============================================================================

struct StateInner<K, V> {
    label: Option<String>,
    state: RefCell<HashMap<K, V>>,
    registrations: RefCell<Vec<Registration<K>>>,
    debugger: Option<DebugFn<K>>,
}

/// A keyed observable state container.
///
/// Cloning is cheap and yields another handle to the same state.
///
/// # Example
///
/// ```
/// use shared_map::{Listener, SharedState, StateOptions};
/// use std::cell::Cell;
/// use std::collections::HashMap;
/// use std::rc::Rc;
///
/// let scores: SharedState<&str, u32> =
///     SharedState::new(HashMap::from([("alice", 1)]), StateOptions::default().with_label("scores"));
///
/// let bob_changes = Rc::new(Cell::new(0));
/// let listener = Listener::new({
///     let bob_changes = bob_changes.clone();
///     move || bob_changes.set(bob_changes.get() + 1)
/// });
/// scores.register(&listener, Some(vec!["bob"]));
///
/// // Not bob: no notification
/// scores.set_state([("alice", Some(2))]).unwrap();
/// assert_eq!(bob_changes.get(), 0);
///
/// let changed = scores.set_state([("bob", Some(5))]).unwrap();
/// assert_eq!(changed, Some(vec![("bob", Some(5))]));
/// assert_eq!(bob_changes.get(), 1);
///
/// // Same value again: nothing changed
/// assert_eq!(scores.set_state([("bob", Some(5))]).unwrap(), None);
/// ```
pub struct SharedState<K, V> {
    inner: Rc<StateInner<K, V>>,
}

impl<K, V> Clone for SharedState<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> SharedState<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Clone + PartialEq + 'static,
{
    /// Create a state from its initial value.
    pub fn new(initial: HashMap<K, V>, options: StateOptions<K>) -> Self {
        Self {
            inner: Rc::new(StateInner {
                label: options.debug_label,
                state: RefCell::new(initial),
                registrations: RefCell::new(Vec::new()),
                debugger: options.debugger,
            }),
        }
    }

    /// The debug label, if one was given.
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    fn busy(&self) -> ContainerError {
        ContainerError::Busy {
            label: self.label().unwrap_or("<unlabelled>").to_string(),
        }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Clone the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.state.borrow().get(key).cloned()
    }

    /// Returns true if a value is stored under `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.state.borrow().contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.inner.state.borrow().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all keys, arbitrary order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.state.borrow().keys().cloned().collect()
    }

    /// Snapshot of all values, arbitrary order.
    pub fn values(&self) -> Vec<V> {
        self.inner.state.borrow().values().cloned().collect()
    }

    /// Borrow the whole state.
    ///
    /// Writes attempted from inside `f` fail with [`ContainerError::Busy`].
    pub fn with_state<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Merge a partial update into the state.
    ///
    /// `(key, Some(value))` inserts or overwrites, `(key, None)` removes.
    /// Entries equal to what is already stored are skipped. Returns the
    /// entries that changed, or `None` when nothing did.
    pub fn set_state(
        &self,
        patch: impl IntoIterator<Item = (K, Option<V>)>,
    ) -> Result<Option<Changes<K, V>>, ContainerError> {
        let changes = {
            let mut state = self.inner.state.try_borrow_mut().map_err(|_| self.busy())?;
            let mut changes = Vec::new();

            for (key, value) in patch {
                match value {
                    Some(value) => {
                        if state.get(&key) == Some(&value) {
                            continue;
                        }
                        state.insert(key.clone(), value.clone());
                        changes.push((key, Some(value)));
                    }
                    None => {
                        if state.remove(&key).is_some() {
                            changes.push((key, None));
                        }
                    }
                }
            }

            changes
        };

        if changes.is_empty() {
            return Ok(None);
        }

        let keys: Vec<K> = changes.iter().map(|(key, _)| key.clone()).collect();
        self.notify(Some(&keys));
        self.debug(DebugKind::Update, &keys, false);

        Ok(Some(changes))
    }

    /// Replace the whole state.
    ///
    /// Subscribers of every key that was added, removed or changed are
    /// notified. Returns those changes.
    pub fn replace(&self, new_state: HashMap<K, V>) -> Result<Changes<K, V>, ContainerError> {
        let changes = {
            let mut state = self.inner.state.try_borrow_mut().map_err(|_| self.busy())?;
            let old = std::mem::replace(&mut *state, new_state);

            let mut changes: Changes<K, V> = state
                .iter()
                .filter(|(key, value)| old.get(*key) != Some(*value))
                .map(|(key, value)| (key.clone(), Some(value.clone())))
                .collect();

            changes.extend(
                old.into_keys()
                    .filter(|key| !state.contains_key(key))
                    .map(|key| (key, None)),
            );

            changes
        };

        let keys: Vec<K> = changes.iter().map(|(key, _)| key.clone()).collect();
        if !keys.is_empty() {
            self.notify(Some(&keys));
        }
        self.debug(DebugKind::Replace, &keys, false);

        Ok(changes)
    }

    /// Re-notify subscribers without changing anything.
    ///
    /// `Some(keys)` reaches the subscribers of those keys (plus global
    /// subscribers); `None` reaches everyone.
    pub fn refresh(&self, keys: Option<&[K]>) -> Result<(), ContainerError> {
        // A refresh while the state is borrowed would re-render from inside the borrow
        drop(self.inner.state.try_borrow_mut().map_err(|_| self.busy())?);

        self.notify(keys);
        self.debug(DebugKind::Refresh, keys.unwrap_or(&[]), keys.is_none());

        Ok(())
    }

    fn notify(&self, keys: Option<&[K]>) {
        let subscribers: Vec<Rc<dyn AnySubscriber>> = {
            let mut registrations = self.inner.registrations.borrow_mut();
            registrations.retain(|r| r.subscriber.strong_count() > 0);

            // A component can hold both an explicit and a hook registration
            let mut seen = HashSet::new();
            registrations
                .iter()
                .filter(|r| r.matches(keys) && seen.insert(r.id))
                .filter_map(|r| r.subscriber.upgrade())
                .collect()
        };

        tracing::trace!(
            label = self.label().unwrap_or("<unlabelled>"),
            subscribers = subscribers.len(),
            "notifying subscribers"
        );

        schedule_all(&subscribers);
    }

    fn debug(&self, kind: DebugKind, keys: &[K], all: bool) {
        tracing::debug!(
            label = self.label().unwrap_or("<unlabelled>"),
            ?kind,
            ?keys,
            all,
            "state changed"
        );

        if let Some(debugger) = &self.inner.debugger {
            debugger(&DebugEvent {
                label: self.label(),
                kind,
                keys,
                all,
            });
        }
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe to some keys (`Some`) or to everything (`None`).
    ///
    /// Registering the same subscriber again widens its key set. Explicit
    /// registrations survive re-renders; see [`use_prop`](Self::use_prop)
    /// for the render-scoped kind.
    pub fn register<S: Subscribe + ?Sized>(&self, subscriber: &S, keys: Option<Vec<K>>) {
        self.register_erased(&subscriber.as_subscriber(), keys, false);
    }

    fn register_erased(
        &self,
        subscriber: &Rc<dyn AnySubscriber>,
        keys: Option<Vec<K>>,
        tracked: bool,
    ) {
        let id = subscriber.subscriber_id();
        let mut registrations = self.inner.registrations.borrow_mut();
        registrations.retain(|r| r.subscriber.strong_count() > 0);

        if let Some(existing) = registrations
            .iter_mut()
            .find(|r| r.id == id && r.tracked == tracked)
        {
            match keys {
                None => existing.keys = None,
                Some(keys) => {
                    if let Some(set) = existing.keys.as_mut() {
                        set.extend(keys);
                    }
                }
            }
            return;
        }

        registrations.push(Registration {
            id,
            subscriber: Rc::downgrade(subscriber),
            keys: keys.map(|keys| keys.into_iter().collect()),
            tracked,
        });
    }

    /// Subscribe the rendering component, if any, until its next render.
    fn track_active(&self, keys: Option<Vec<K>>) {
        let Some(component) = with_context(|ctx| ctx.get_active_component()) else {
            return;
        };

        self.register_erased(&component, keys, true);

        let inner: Weak<StateInner<K, V>> = Rc::downgrade(&self.inner);
        let dependency: Weak<dyn AnyDependency> = inner;
        component.track(dependency);
    }

    /// Remove every registration of this subscriber.
    pub fn unregister<S: Subscribe + ?Sized>(&self, subscriber: &S) {
        let id = subscriber.as_subscriber().subscriber_id();
        self.inner
            .registrations
            .borrow_mut()
            .retain(|r| r.id != id);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .registrations
            .borrow()
            .iter()
            .filter(|r| r.subscriber.strong_count() > 0)
            .map(|r| r.id)
            .collect::<HashSet<_>>()
            .len()
    }

    // =========================================================================
    // HOOKS
    // =========================================================================

    /// Read one key and subscribe the rendering component to it.
    ///
    /// The subscription covers the keys read by the component's latest
    /// render only. Outside a render this is a plain [`get`](Self::get).
    pub fn use_prop(&self, key: &K) -> Option<V> {
        self.track_active(Some(vec![key.clone()]));
        self.get(key)
    }

    /// Read the whole state and subscribe the rendering component to every key.
    pub fn use_state(&self) -> HashMap<K, V> {
        self.track_active(None);
        self.inner.state.borrow().clone()
    }
}

impl<K, V> AnyDependency for StateInner<K, V>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    fn release(&self, subscriber_id: u64) {
        if let Ok(mut registrations) = self.registrations.try_borrow_mut() {
            registrations.retain(|r| !(r.tracked && r.id == subscriber_id));
        }
    }
}

impl<K, V> Debug for SharedState<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedState")
            .field("label", &self.inner.label)
            .field("state", &self.inner.state)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
