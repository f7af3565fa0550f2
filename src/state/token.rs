// ============================================================================
// shared-map - Update Token
// Opaque change signal regenerated on every list-level mutation
// ============================================================================

use std::fmt;

use crate::core::context::with_context;

/// A list-version token.
///
/// Every call to [`UpdateToken::next`] returns a value that has never been
/// handed out before on this thread. Only "did it change" is meaningful;
/// the ordering exists so tokens can live in ordered collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpdateToken(u64);

impl UpdateToken {
    /// The token a map starts with. Never returned by [`UpdateToken::next`].
    pub const INITIAL: Self = Self(0);

    /// Generate a fresh token.
    pub fn next() -> Self {
        Self(with_context(|ctx| ctx.increment_update_counter()))
    }

    /// Raw counter value, for diagnostics.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UpdateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update#{}", self.0)
    }
}
