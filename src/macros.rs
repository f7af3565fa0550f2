// ============================================================================
// shared-map - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Shared maps, states and components are cheap `Rc` handles, so render
/// functions usually start by cloning the handles they need.
///
/// # Usage
///
/// ```rust
/// use shared_map::{cloned, Component, SharedMap};
/// use serde_json::Value;
///
/// let users: SharedMap<Value> = SharedMap::empty("id");
///
/// let view = Component::mount("count", cloned!(users => move || {
///     let _ = users.use_list().data.len();
/// }));
/// assert_eq!(view.render_count(), 1);
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Mount a component with automatic variable capturing.
///
/// Wraps `Component::mount(name, cloned!(... => move || ...))`.
///
/// # Usage
///
/// ```rust
/// use shared_map::{component, SharedMap};
/// use serde_json::{json, Value};
///
/// let users: SharedMap<Value> = SharedMap::empty("id");
///
/// let detail = component!("detail", users => {
///     let _ = users.use_element("ada");
/// });
///
/// users.add([json!({ "id": "ada" })]).unwrap();
/// assert_eq!(detail.render_count(), 2);
/// ```
#[macro_export]
macro_rules! component {
    // Case 1: With captured handles
    ($name:expr, $($deps:ident),+ => $body:expr) => {
        $crate::Component::mount($name, $crate::cloned!($($deps),+ => move || { $body; }))
    };
    // Case 2: Nothing captured
    ($name:expr => $body:expr) => {
        $crate::Component::mount($name, move || { $body; })
    };
}
