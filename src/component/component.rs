// ============================================================================
// shared-map - Component
// A minimal render host: render function, hook slots, re-render on notify
// ============================================================================
//
// A component renders once when mounted and again every time a state it read
// through a hook notifies it. While its render function runs it is the
// thread's active component, which is how hooks know whom to subscribe.
// Renders run inside a batch, so writes made during a render are flushed
// after it returns.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::core::constants::*;
use crate::core::context::{next_subscriber_id, with_context};
use crate::core::types::{AnyDependency, AnySubscriber, Subscribe};
use crate::reactivity::batching::batch;

type RenderFn = Box<dyn FnMut()>;

// =============================================================================
// COMPONENT INNER
// =============================================================================

/// Internal component state, shared between the handle and subscriptions.
pub struct ComponentInner {
    id: u64,
    name: String,
    flags: Cell<u32>,

    /// Taken out while rendering
    render_fn: RefCell<Option<RenderFn>>,

    /// Positional hook storage
    hooks: RefCell<Vec<Rc<dyn Any>>>,
    hook_index: Cell<usize>,

    render_count: Cell<usize>,

    /// States subscribed through hooks during the last render
    dependencies: RefCell<Vec<Weak<dyn AnyDependency>>>,

    this: Weak<ComponentInner>,
}

impl ComponentInner {
    /// Run the render function with this component active.
    fn render(&self) {
        if self.is_unmounted() {
            return;
        }

        let Some(this) = self.this.upgrade() else {
            return;
        };

        let Some(render_fn) = self.render_fn.borrow_mut().take() else {
            // Already rendering: go again once the current pass finishes
            self.mark_dirty();
            let pending: Weak<dyn AnySubscriber> = self.this.clone();
            with_context(|ctx| ctx.add_pending(pending));
            return;
        };

        // Notifications arriving during the render re-dirty us
        self.mark_clean();
        self.set_flags(self.flags() | RENDERING);
        self.hook_index.set(0);

        // This render's hook reads subscribe from scratch
        self.release_dependencies();

        let prev = with_context(|ctx| ctx.set_active_component(Some(this as Rc<dyn AnySubscriber>)));

        tracing::trace!(component = %self.name, render = self.render_count.get() + 1, "rendering");

        // Restores everything before the batch flushes, even on panic
        struct RenderGuard<'a> {
            component: &'a ComponentInner,
            prev: Option<Rc<dyn AnySubscriber>>,
            render_fn: Option<RenderFn>,
        }

        impl Drop for RenderGuard<'_> {
            fn drop(&mut self) {
                let prev = self.prev.take();
                with_context(|ctx| ctx.set_active_component(prev));

                let component = self.component;
                component.set_flags(component.flags() & !RENDERING);
                component.render_count.set(component.render_count.get() + 1);

                if !component.is_unmounted() {
                    *component.render_fn.borrow_mut() = self.render_fn.take();
                }
            }
        }

        batch(|| {
            let mut guard = RenderGuard {
                component: self,
                prev,
                render_fn: Some(render_fn),
            };

            if let Some(render_fn) = guard.render_fn.as_mut() {
                render_fn();
            }
        });
    }

    fn release_dependencies(&self) {
        let dependencies = std::mem::take(&mut *self.dependencies.borrow_mut());
        for dependency in dependencies.iter().filter_map(Weak::upgrade) {
            dependency.release(self.id);
        }
    }

    /// Strong handle to this component, while it is alive.
    pub(crate) fn handle(&self) -> Option<Rc<ComponentInner>> {
        self.this.upgrade()
    }

    /// Fetch (or create) the hook slot at the current position.
    pub(crate) fn use_hook<S: 'static>(&self, init: impl FnOnce() -> S) -> Rc<S> {
        let index = self.hook_index.get();
        self.hook_index.set(index + 1);

        let existing = self.hooks.borrow().get(index).cloned();

        if let Some(slot) = existing {
            match slot.downcast::<S>() {
                Ok(state) => return state,
                Err(_) => {
                    tracing::warn!(
                        component = %self.name,
                        index,
                        "hook type changed between renders; hooks must be called in the same order every render"
                    );
                }
            }
        }

        let state = Rc::new(init());
        let erased: Rc<dyn Any> = state.clone();
        let mut hooks = self.hooks.borrow_mut();
        if index < hooks.len() {
            hooks[index] = erased;
        } else {
            hooks.push(erased);
        }
        state
    }
}

impl AnySubscriber for ComponentInner {
    fn subscriber_id(&self) -> u64 {
        self.id
    }

    fn flags(&self) -> u32 {
        self.flags.get()
    }

    fn set_flags(&self, flags: u32) {
        self.flags.set(flags);
    }

    fn update(&self) {
        self.render();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn track(&self, dependency: Weak<dyn AnyDependency>) {
        let mut dependencies = self.dependencies.borrow_mut();
        if !dependencies.iter().any(|known| known.ptr_eq(&dependency)) {
            dependencies.push(dependency);
        }
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// A mounted component.
///
/// Cloning yields another handle to the same component.
///
/// # Example
///
/// ```
/// use shared_map::{Component, SharedMap};
/// use serde_json::{json, Value};
///
/// let users: SharedMap<Value> = SharedMap::empty("id");
///
/// let list = Component::mount("user-list", {
///     let users = users.clone();
///     move || {
///         let view = users.use_list();
///         let _rows = view.data.len();
///     }
/// });
/// assert_eq!(list.render_count(), 1);
///
/// users.add([json!({ "id": "ada", "name": "Ada" })]).unwrap();
/// assert_eq!(list.render_count(), 2);
/// ```
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

impl Component {
    /// Create a component and render it once.
    pub fn mount(name: impl Into<String>, render: impl FnMut() + 'static) -> Self {
        let name = name.into();
        let inner = Rc::new_cyclic(|this| ComponentInner {
            id: next_subscriber_id(),
            name,
            flags: Cell::new(COMPONENT | CLEAN),
            render_fn: RefCell::new(Some(Box::new(render))),
            hooks: RefCell::new(Vec::new()),
            hook_index: Cell::new(0),
            render_count: Cell::new(0),
            dependencies: RefCell::new(Vec::new()),
            this: this.clone(),
        });

        tracing::debug!(component = %inner.name, id = inner.id, "mounting component");

        inner.render();
        Self { inner }
    }

    /// Force a render right now.
    pub fn render(&self) {
        self.inner.render();
    }

    /// Stop rendering and drop all hook state.
    ///
    /// Hook subscriptions are released. Explicit registrations stay until
    /// the last handle drops; the scheduler skips unmounted subscribers.
    pub fn unmount(&self) {
        let inner = &self.inner;
        inner.set_flags(inner.flags() | UNMOUNTED);
        inner.render_fn.borrow_mut().take();
        inner.hooks.borrow_mut().clear();
        inner.release_dependencies();

        tracing::debug!(component = %inner.name, id = inner.id, "unmounted component");
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// How many renders have completed.
    pub fn render_count(&self) -> usize {
        self.inner.render_count.get()
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.is_unmounted()
    }

    pub(crate) fn from_inner(inner: Rc<ComponentInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<ComponentInner> {
        &self.inner
    }
}

impl Subscribe for Component {
    fn as_subscriber(&self) -> Rc<dyn AnySubscriber> {
        self.inner.clone()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("render_count", &self.inner.render_count.get())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
