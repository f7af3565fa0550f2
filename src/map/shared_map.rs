// ============================================================================
// shared-map - SharedMap
// A keyed record collection with per-record and whole-list subscriptions
// ============================================================================
//
// Two states are composed:
//
// 1. Record state: Id -> record. Element subscribers (use_element) are
//    registered per id and only hear about their own record.
// 2. Update state: a single list-version token. List subscribers
//    (use_list, register_list) hear about every membership change without
//    re-checking each record.
//
// Every mutation runs in one batch, so a subscriber of both states renders
// once per mutation.
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::component::hooks;
use crate::core::constants::UPDATE_ID;
use crate::core::error::{
    ContainerError, StateError, ADD_DATA, CREATE_MAP, REFRESH_MAP, REMOVE_DATA, RESET_MAP,
};
use crate::core::types::Subscribe;
use crate::reactivity::batching::batch;
use crate::state::{SharedState, StateOptions, UpdateToken};

use super::element::{Element, Id};
use super::options::MapOptions;

// =============================================================================
// LIST VIEW
// =============================================================================

/// What [`SharedMap::use_list`] returns: the current token and all records.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<E> {
    pub update_id: UpdateToken,
    pub data: Vec<E>,
}

// =============================================================================
// SHARED MAP
// =============================================================================

/// A keyed collection of records.
///
/// Records are stored under the value of their key field. Cloning is cheap
/// and yields another handle to the same collection.
///
/// # Example
///
/// ```
/// use shared_map::{MapOptions, SharedMap};
/// use serde_json::json;
///
/// let users = SharedMap::new(
///     "id",
///     MapOptions::default().with_default_data([
///         json!({ "id": 1, "name": "a" }),
///         json!({ "id": 2, "name": "b" }),
///     ]),
/// )
/// .unwrap();
///
/// assert_eq!(users.get(1), Some(json!({ "id": 1, "name": "a" })));
///
/// users.add([json!({ "id": 2, "name": "c" })]).unwrap();
/// assert_eq!(users.get(2), Some(json!({ "id": 2, "name": "c" })));
/// assert_eq!(users.len(), 2);
///
/// users.remove([1]).unwrap();
/// assert_eq!(users.get(1), None);
/// assert_eq!(users.len(), 1);
///
/// users.reset().unwrap();
/// assert!(users.data().is_empty());
/// ```
pub struct SharedMap<E> {
    key: Rc<str>,
    state: SharedState<Id, E>,
    update_state: SharedState<&'static str, UpdateToken>,
}

impl<E> Clone for SharedMap<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            state: self.state.clone(),
            update_state: self.update_state.clone(),
        }
    }
}

impl<E: Element> SharedMap<E> {
    /// Create a map keyed by `key`, starting with `options.default_data`.
    ///
    /// Duplicate ids in the default data keep the last record. Fails with
    /// `CREATE_MAP_ERROR` if a default record has no usable key field.
    pub fn new(key: impl Into<String>, options: MapOptions<E>) -> Result<Self, StateError> {
        let key: String = key.into();
        let state_options = options.state_options();

        let initial: HashMap<Id, E> = Self::elements_to_state(&key, options.default_data)
            .map_err(|cause| StateError::transform(cause, CREATE_MAP))?
            .into_iter()
            .collect();

        let update_options = StateOptions {
            debug_label: options.debug_label.as_ref().map(|label| format!("{label}:updates")),
            debugger: None,
        };

        tracing::debug!(
            label = options.debug_label.as_deref().unwrap_or("<unlabelled>"),
            key = %key,
            records = initial.len(),
            "created shared map"
        );

        Ok(Self {
            key: key.into(),
            state: SharedState::new(initial, state_options),
            update_state: SharedState::new(
                HashMap::from([(UPDATE_ID, UpdateToken::INITIAL)]),
                update_options,
            ),
        })
    }

    /// Create an empty map keyed by `key`.
    pub fn empty(key: impl Into<String>) -> Self {
        let key: String = key.into();
        Self {
            key: key.into(),
            state: SharedState::new(HashMap::new(), StateOptions::default()),
            update_state: SharedState::new(
                HashMap::from([(UPDATE_ID, UpdateToken::INITIAL)]),
                StateOptions::default(),
            ),
        }
    }

    /// Pair every record with its id; fails on the first record without one.
    fn elements_to_state(
        key: &str,
        elements: impl IntoIterator<Item = E>,
    ) -> Result<Vec<(Id, E)>, ContainerError> {
        elements
            .into_iter()
            .map(|element| match element.id(key) {
                Some(id) => Ok((id, element)),
                None => Err(ContainerError::MissingKey {
                    field: key.to_string(),
                }),
            })
            .collect()
    }

    fn update_update_state(&self) -> Result<UpdateToken, ContainerError> {
        let token = UpdateToken::next();
        self.update_state.set_state([(UPDATE_ID, Some(token))])?;
        Ok(token)
    }

    fn log_change(&self, op: &'static str, ids: &[Id], token: UpdateToken) {
        tracing::debug!(
            label = self.label().unwrap_or("<unlabelled>"),
            op,
            ?ids,
            %token,
            "map changed"
        );
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Name of the key field.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The debug label, if one was given.
    pub fn label(&self) -> Option<&str> {
        self.state.label()
    }

    /// The record stored under `id`.
    pub fn get(&self, id: impl Into<Id>) -> Option<E> {
        self.state.get(&id.into())
    }

    /// Returns true if a record is stored under `id`.
    pub fn contains(&self, id: impl Into<Id>) -> bool {
        self.state.contains_key(&id.into())
    }

    /// All records, arbitrary order.
    pub fn data(&self) -> Vec<E> {
        self.state.values()
    }

    /// All ids, arbitrary order.
    pub fn ids(&self) -> Vec<Id> {
        self.state.keys()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// The current list-version token, without subscribing.
    pub fn update_id(&self) -> UpdateToken {
        self.update_state.get(&UPDATE_ID).unwrap_or_default()
    }

    // =========================================================================
    // ADD
    // =========================================================================

    /// Insert or overwrite records by id, keeping every other record.
    pub fn add(&self, elements: impl IntoIterator<Item = E>) -> Result<(), StateError> {
        self.add_with_callback(elements, || {})
    }

    /// [`add`](Self::add), then run `on_complete` (even if nothing changed).
    pub fn add_with_callback(
        &self,
        elements: impl IntoIterator<Item = E>,
        on_complete: impl FnOnce(),
    ) -> Result<(), StateError> {
        batch(|| -> Result<(), ContainerError> {
            // Duplicate ids collapse to the last record before comparing
            let records: HashMap<Id, E> = Self::elements_to_state(&self.key, elements)?
                .into_iter()
                .collect();
            let patch = records
                .into_iter()
                .map(|(id, element)| (id, Some(element)));

            if let Some(changes) = self.state.set_state(patch)? {
                let token = self.update_update_state()?;
                let ids: Vec<Id> = changes.into_iter().map(|(id, _)| id).collect();
                self.log_change("add", &ids, token);
            }

            Ok(())
        })
        .map_err(|cause| StateError::transform(cause, ADD_DATA))?;

        on_complete();
        Ok(())
    }

    // =========================================================================
    // REMOVE
    // =========================================================================

    /// Remove the records stored under `ids`. Unknown ids are ignored.
    pub fn remove<I: Into<Id>>(&self, ids: impl IntoIterator<Item = I>) -> Result<(), StateError> {
        self.remove_with_callback(ids, || {})
    }

    /// [`remove`](Self::remove), then run `on_complete` (even if nothing changed).
    pub fn remove_with_callback<I: Into<Id>>(
        &self,
        ids: impl IntoIterator<Item = I>,
        on_complete: impl FnOnce(),
    ) -> Result<(), StateError> {
        batch(|| -> Result<(), ContainerError> {
            let patch = ids.into_iter().map(|id| (id.into(), None));

            if let Some(changes) = self.state.set_state(patch)? {
                let token = self.update_update_state()?;
                let ids: Vec<Id> = changes.into_iter().map(|(id, _)| id).collect();
                self.log_change("remove", &ids, token);
            }

            Ok(())
        })
        .map_err(|cause| StateError::transform(cause, REMOVE_DATA))?;

        on_complete();
        Ok(())
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Re-notify the subscribers of `ids` and every list subscriber.
    ///
    /// For records mutated through interior mutability behind the map's back.
    pub fn refresh<I: Into<Id>>(&self, ids: impl IntoIterator<Item = I>) -> Result<(), StateError> {
        let ids: Vec<Id> = ids.into_iter().map(Into::into).collect();
        self.refresh_keys(Some(&ids))
    }

    /// Re-notify every subscriber of the map.
    pub fn refresh_all(&self) -> Result<(), StateError> {
        self.refresh_keys(None)
    }

    fn refresh_keys(&self, ids: Option<&[Id]>) -> Result<(), StateError> {
        batch(|| -> Result<(), ContainerError> {
            self.state.refresh(ids)?;
            let token = self.update_update_state()?;
            self.log_change("refresh", ids.unwrap_or(&[]), token);
            Ok(())
        })
        .map_err(|cause| StateError::transform(cause, REFRESH_MAP))
    }

    // =========================================================================
    // RESET
    // =========================================================================

    /// Remove every record.
    pub fn reset(&self) -> Result<(), StateError> {
        self.reset_to(std::iter::empty())
    }

    /// Replace all records with `elements` (not merged).
    pub fn reset_to(&self, elements: impl IntoIterator<Item = E>) -> Result<(), StateError> {
        batch(|| -> Result<(), ContainerError> {
            let new_state: HashMap<Id, E> = Self::elements_to_state(&self.key, elements)?
                .into_iter()
                .collect();

            let changes = self.state.replace(new_state)?;
            let token = self.update_update_state()?;
            let ids: Vec<Id> = changes.into_iter().map(|(id, _)| id).collect();
            self.log_change("reset", &ids, token);
            Ok(())
        })
        .map_err(|cause| StateError::transform(cause, RESET_MAP))
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Notify `subscriber` on every membership change.
    pub fn register_list<S: Subscribe + ?Sized>(&self, subscriber: &S) {
        self.update_state.register(subscriber, Some(vec![UPDATE_ID]));
    }

    pub fn unregister_list<S: Subscribe + ?Sized>(&self, subscriber: &S) {
        self.update_state.unregister(subscriber);
    }

    /// Notify `subscriber` when any of the records under `ids` changes.
    pub fn register_element<S, I>(&self, subscriber: &S, ids: impl IntoIterator<Item = I>)
    where
        S: Subscribe + ?Sized,
        I: Into<Id>,
    {
        let ids: Vec<Id> = ids.into_iter().map(Into::into).collect();
        self.state.register(subscriber, Some(ids));
    }

    pub fn unregister_element<S: Subscribe + ?Sized>(&self, subscriber: &S) {
        self.state.unregister(subscriber);
    }

    // =========================================================================
    // HOOKS
    // =========================================================================

    /// Read one record and re-render the calling component when it changes.
    pub fn use_element(&self, id: impl Into<Id>) -> Option<E> {
        self.state.use_prop(&id.into())
    }

    /// Read all records and re-render the calling component on every
    /// membership change.
    pub fn use_list(&self) -> ListView<E> {
        let update_id = self.update_state.use_prop(&UPDATE_ID).unwrap_or_default();
        ListView {
            update_id,
            data: self.data(),
        }
    }

    /// Derive a value from all records, recomputed only when the
    /// list-version token changes.
    pub fn use_memo<T: Clone + 'static>(&self, f: impl FnOnce(&[E]) -> T) -> T {
        let ListView { update_id, data } = self.use_list();
        hooks::use_memo(update_id, || f(&data))
    }
}

impl<E: fmt::Debug> fmt::Debug for SharedMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMap")
            .field("key", &self.key)
            .field("state", &self.state)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Listener};
    use crate::core::error::ErrorCode;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        name: &'static str,
    }

    impl Element for Item {
        fn id(&self, _key_field: &str) -> Option<Id> {
            Some(Id::Num(self.id))
        }
    }

    fn item(id: i64, name: &'static str) -> Item {
        Item { id, name }
    }

    fn map() -> SharedMap<Item> {
        SharedMap::new(
            "id",
            MapOptions::default()
                .with_label("items")
                .with_default_data([item(1, "a"), item(2, "b")]),
        )
        .unwrap()
    }

    fn counter() -> (Rc<Listener>, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let listener = Listener::new({
            let count = count.clone();
            move || count.set(count.get() + 1)
        });
        (listener, count)
    }

    #[test]
    fn construct_from_default_data() {
        let m = map();
        assert_eq!(m.get(1), Some(item(1, "a")));
        assert_eq!(m.get(2), Some(item(2, "b")));
        assert_eq!(m.len(), 2);
        assert_eq!(m.key(), "id");
        assert_eq!(m.label(), Some("items"));
        assert_eq!(m.update_id(), UpdateToken::INITIAL);
    }

    #[test]
    fn duplicate_default_ids_keep_last() {
        let m = SharedMap::new(
            "id",
            MapOptions::default().with_default_data([item(1, "first"), item(1, "second")]),
        )
        .unwrap();

        assert_eq!(m.len(), 1);
        assert_eq!(m.get(1), Some(item(1, "second")));
    }

    #[test]
    fn add_merges_and_overwrites() {
        let m = map();
        m.add([item(2, "c"), item(3, "d")]).unwrap();

        assert_eq!(m.get(1), Some(item(1, "a")));
        assert_eq!(m.get(2), Some(item(2, "c")));
        assert_eq!(m.get(3), Some(item(3, "d")));
        assert_eq!(m.len(), 3);
    }

    #[test]
    fn add_single_record_via_option() {
        let m = map();
        m.add(Some(item(9, "z"))).unwrap();
        assert!(m.contains(9));
    }

    #[test]
    fn add_changes_token_only_on_change() {
        let m = map();
        let before = m.update_id();

        m.add([item(1, "a")]).unwrap();
        assert_eq!(m.update_id(), before);

        m.add([item(1, "changed")]).unwrap();
        assert_ne!(m.update_id(), before);
    }

    #[test]
    fn duplicate_ids_in_one_add_keep_last() {
        let m = map();
        let (listener, count) = counter();
        m.register_list(&listener);
        let before = m.update_id();

        // Changed, then changed back within the same call
        m.add([item(1, "tmp"), item(1, "a")]).unwrap();
        assert_eq!(m.get(1), Some(item(1, "a")));
        assert_eq!(m.update_id(), before);
        assert_eq!(count.get(), 0);

        m.add([item(2, "x"), item(2, "y")]).unwrap();
        assert_eq!(m.get(2), Some(item(2, "y")));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn add_callback_runs_even_without_change() {
        let m = map();
        let called = Cell::new(false);
        m.add_with_callback([item(1, "a")], || called.set(true))
            .unwrap();
        assert!(called.get());
    }

    #[test]
    fn remove_by_id() {
        let m = map();
        let before = m.update_id();
        m.remove([1]).unwrap();

        assert_eq!(m.get(1), None);
        assert_eq!(m.len(), 1);
        assert_ne!(m.update_id(), before);
    }

    #[test]
    fn remove_unknown_id_is_noop() {
        let m = map();
        let before = m.update_id();
        let called = Cell::new(false);

        m.remove_with_callback([42], || called.set(true)).unwrap();

        assert_eq!(m.len(), 2);
        assert_eq!(m.update_id(), before);
        assert!(called.get());
    }

    #[test]
    fn add_remove_add_restores() {
        let m = map();
        m.remove([1]).unwrap();
        m.add([item(1, "back")]).unwrap();
        assert_eq!(m.get(1), Some(item(1, "back")));
    }

    #[test]
    fn reset_clears_everything() {
        let m = map();
        let before = m.update_id();
        m.reset().unwrap();

        assert!(m.is_empty());
        assert_eq!(m.get(1), None);
        assert_eq!(m.get(2), None);
        assert_ne!(m.update_id(), before);
    }

    #[test]
    fn reset_to_replaces_not_merges() {
        let m = map();
        m.reset_to([item(3, "c")]).unwrap();

        assert_eq!(m.get(1), None);
        assert_eq!(m.get(3), Some(item(3, "c")));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn reset_of_empty_map_still_changes_token() {
        let m: SharedMap<Item> = SharedMap::empty("id");
        let before = m.update_id();
        m.reset().unwrap();
        assert_ne!(m.update_id(), before);
    }

    #[test]
    fn refresh_changes_token_not_data() {
        let m = map();
        let before = m.update_id();
        let data_before = {
            let mut d = m.data();
            d.sort_by_key(|i| i.id);
            d
        };

        m.refresh([1]).unwrap();

        let mut data_after = m.data();
        data_after.sort_by_key(|i| i.id);
        assert_ne!(m.update_id(), before);
        assert_eq!(data_before, data_after);
    }

    #[test]
    fn element_subscription_is_scoped() {
        let m = map();
        let (listener, count) = counter();
        m.register_element(&listener, [1]);

        m.add([item(2, "other")]).unwrap();
        assert_eq!(count.get(), 0);

        m.add([item(1, "mine")]).unwrap();
        assert_eq!(count.get(), 1);

        m.remove([1]).unwrap();
        assert_eq!(count.get(), 2);

        m.unregister_element(&listener);
        m.add([item(1, "again")]).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn list_subscription_sees_every_mutation() {
        let m = map();
        let (listener, count) = counter();
        m.register_list(&listener);

        m.add([item(5, "e")]).unwrap();
        m.remove([1]).unwrap();
        m.refresh_all().unwrap();
        m.reset().unwrap();
        assert_eq!(count.get(), 4);

        m.unregister_list(&listener);
        m.add([item(6, "f")]).unwrap();
        assert_eq!(count.get(), 4);
    }

    #[test]
    fn refresh_reaches_element_subscribers_of_that_id() {
        let m = map();
        let (one, one_count) = counter();
        let (two, two_count) = counter();
        m.register_element(&one, [1]);
        m.register_element(&two, [2]);

        m.refresh([1]).unwrap();
        assert_eq!((one_count.get(), two_count.get()), (1, 0));

        m.refresh_all().unwrap();
        assert_eq!((one_count.get(), two_count.get()), (2, 1));
    }

    #[test]
    fn use_element_and_use_list_render_once_per_mutation() {
        let m = map();
        let view = Component::mount("both", {
            let m = m.clone();
            move || {
                let _ = m.use_element(1);
                let _ = m.use_list();
            }
        });

        m.add([item(1, "changed")]).unwrap();
        assert_eq!(view.render_count(), 2);
    }

    #[test]
    fn use_memo_recomputes_on_token_change() {
        let m = map();
        let computed = Rc::new(Cell::new(0));
        let total = Rc::new(Cell::new(0usize));

        let view = Component::mount("memo", {
            let m = m.clone();
            let computed = computed.clone();
            let total = total.clone();
            move || {
                let len = m.use_memo(|data| {
                    computed.set(computed.get() + 1);
                    data.len()
                });
                total.set(len);
            }
        });

        view.render();
        assert_eq!(computed.get(), 1);

        m.add([item(3, "c")]).unwrap();
        assert_eq!(computed.get(), 2);
        assert_eq!(total.get(), 3);
    }

    #[test]
    fn missing_key_fails_add() {
        #[derive(Debug, Clone, PartialEq)]
        struct Keyless;

        impl Element for Keyless {
            fn id(&self, _key_field: &str) -> Option<Id> {
                None
            }
        }

        let m: SharedMap<Keyless> = SharedMap::empty("id");
        let called = Cell::new(false);
        let err = m
            .add_with_callback([Keyless], || called.set(true))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::AddData);
        assert_eq!(
            err.cause(),
            &ContainerError::MissingKey {
                field: "id".to_string()
            }
        );
        assert!(!called.get());
        assert!(m.is_empty());

        let err = SharedMap::new("id", MapOptions::default().with_default_data([Keyless]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CreateMap);

        let err = m.reset_to([Keyless]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ResetMap);
    }

    #[test]
    fn reentrant_write_is_classified() {
        let m = map();
        let result: RefCell<Option<StateError>> = RefCell::new(None);

        // A list listener that writes while the record state is being read
        let reader = m.clone();
        let writer = m.clone();
        reader.state.with_state(|_| {
            *result.borrow_mut() = writer.add([item(7, "g")]).err();
        });

        let err = result.into_inner().unwrap();
        assert_eq!(err.code(), ErrorCode::AddData);
        assert!(matches!(err.cause(), ContainerError::Busy { .. }));

        let remove_err = m.state.with_state(|_| m.remove([1])).unwrap_err();
        assert_eq!(remove_err.code(), ErrorCode::RemoveData);

        let refresh_err = m.state.with_state(|_| m.refresh([1])).unwrap_err();
        assert_eq!(refresh_err.code(), ErrorCode::RefreshMap);

        let reset_err = m.state.with_state(|_| m.reset()).unwrap_err();
        assert_eq!(reset_err.code(), ErrorCode::ResetMap);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn debugger_sees_record_changes() {
        let seen: Rc<RefCell<Vec<Vec<Id>>>> = Rc::new(RefCell::new(Vec::new()));
        let m: SharedMap<Item> = SharedMap::new(
            "id",
            MapOptions::default().with_debugger({
                let seen = seen.clone();
                move |event| seen.borrow_mut().push(event.keys.to_vec())
            }),
        )
        .unwrap();

        m.add([item(1, "a")]).unwrap();
        m.remove([1]).unwrap();

        assert_eq!(*seen.borrow(), vec![vec![Id::Num(1)], vec![Id::Num(1)]]);
    }
}
