//! Owning contexts and dispatch targets.
//!
//! An owning context is the isolation domain an observer belongs to (a
//! document group with its own task queue). Deliveries are batched per context.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of an owning context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Creates a new random context id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Creates a nil context id (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a delivery task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "context", rename_all = "snake_case")]
pub enum DispatchTarget {
    /// The global default sequence, used for detached observers.
    Global,
    /// The queue of one owning context.
    Context(ContextId),
}

impl DispatchTarget {
    /// Maps an observer's owning context to its dispatch target.
    #[must_use]
    pub const fn for_context(context: Option<ContextId>) -> Self {
        match context {
            Some(id) => Self::Context(id),
            None => Self::Global,
        }
    }

    /// The owning context this target is scoped to, if any.
    #[must_use]
    pub const fn context(&self) -> Option<ContextId> {
        match self {
            Self::Global => None,
            Self::Context(id) => Some(*id),
        }
    }
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Context(id) => write!(f, "context:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_maps_to_global() {
        assert_eq!(DispatchTarget::for_context(None), DispatchTarget::Global);
        assert_eq!(DispatchTarget::Global.context(), None);
    }

    #[test]
    fn test_context_round_trip() {
        let id = ContextId::new();
        let target = DispatchTarget::for_context(Some(id));
        assert_eq!(target, DispatchTarget::Context(id));
        assert_eq!(target.context(), Some(id));
    }

    #[test]
    fn test_display() {
        assert_eq!(DispatchTarget::Global.to_string(), "global");
        let target = DispatchTarget::Context(ContextId::nil());
        assert!(target.to_string().starts_with("context:"));
    }
}
