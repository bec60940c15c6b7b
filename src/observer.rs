//! Observer capability set and non-owning observer handles.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::context::ContextId;

/// An external link-like object that wants to learn when its URI is visited.
///
/// The registry only ever calls these methods from inside a delivery task,
/// never while it is registering, unregistering or fanning out.
pub trait LinkObserver: Send + Sync {
    /// The isolation domain this observer belongs to, or `None` if detached.
    fn owning_context(&self) -> Option<ContextId>;

    /// Transitions the observer to its terminal visited state.
    ///
    /// Must be idempotent. Any return information is ignored.
    fn mark_visited(&self);
}

/// Non-owning reference to a [`LinkObserver`].
///
/// The registry never keeps the observer alive. Its owner must call
/// `VisitedRegistry::unregister` for every URI it registered **before**
/// dropping the observer; the registry does not track liveness on its own.
/// A handle found dangling during delivery is reported as misuse and pruned.
///
/// Two handles are equal when they point at the same observer object.
#[derive(Clone)]
pub struct ObserverHandle {
    target: Weak<dyn LinkObserver>,
}

impl ObserverHandle {
    /// Creates a handle borrowing `target`.
    #[must_use]
    pub fn new<T: LinkObserver + 'static>(target: &Arc<T>) -> Self {
        let target: Weak<T> = Arc::downgrade(target);
        Self { target }
    }

    /// Creates a handle from an already type-erased observer.
    #[must_use]
    pub fn from_dyn(target: &Arc<dyn LinkObserver>) -> Self {
        Self {
            target: Arc::downgrade(target),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<dyn LinkObserver>> {
        self.target.upgrade()
    }

    pub(crate) fn owning_context(&self) -> Option<Option<ContextId>> {
        self.upgrade().map(|observer| observer.owning_context())
    }
}

impl PartialEq for ObserverHandle {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.target, &other.target)
    }
}

impl Eq for ObserverHandle {}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("target", &self.target.as_ptr().cast::<()>())
            .finish()
    }
}
