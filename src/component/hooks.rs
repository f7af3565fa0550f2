// ============================================================================
// shared-map - Hooks
// Positional per-component state and memoization
// ============================================================================
//
// Hooks rely on consistent ordering between renders: the n-th hook call of a
// render always gets the n-th slot. Any function prefixed with "use" should
// not be called conditionally.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::context::with_context;

use super::component::{Component, ComponentInner};

/// The component whose render function is running, if any.
pub fn current_component() -> Option<Component> {
    let active = with_context(|ctx| ctx.get_active_component())?;
    let inner = active.as_any().downcast_ref::<ComponentInner>()?;
    inner.handle().map(Component::from_inner)
}

/// Get the state stored in the current hook slot, creating it with `init`
/// on the first render.
///
/// Outside a render there is no slot to keep, so every call gets fresh state.
pub fn use_hook<S: 'static>(init: impl FnOnce() -> S) -> Rc<S> {
    match current_component() {
        Some(component) => component.inner().use_hook(init),
        None => Rc::new(init()),
    }
}

/// Memoize `compute()` until `deps` changes.
///
/// The value is recomputed on the first render and whenever `deps` differs
/// from the value passed on the previous render. Outside a render the value
/// is computed every call.
///
/// # Example
///
/// ```
/// use shared_map::{use_memo, Component};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let computed = Rc::new(Cell::new(0));
/// let deps = Rc::new(Cell::new(1));
///
/// let view = Component::mount("memo", {
///     let computed = computed.clone();
///     let deps = deps.clone();
///     move || {
///         let _total = use_memo(deps.get(), || {
///             computed.set(computed.get() + 1);
///             deps.get() * 10
///         });
///     }
/// });
///
/// view.render();
/// assert_eq!(computed.get(), 1);
///
/// deps.set(2);
/// view.render();
/// assert_eq!(computed.get(), 2);
/// ```
pub fn use_memo<T, D>(deps: D, compute: impl FnOnce() -> T) -> T
where
    T: Clone + 'static,
    D: PartialEq + 'static,
{
    let slot: Rc<RefCell<Option<(D, T)>>> = use_hook(|| RefCell::new(None));

    if let Some((prev, value)) = slot.borrow().as_ref() {
        if *prev == deps {
            return value.clone();
        }
    }

    let value = compute();
    *slot.borrow_mut() = Some((deps, value.clone()));
    value
}
