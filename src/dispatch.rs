//! Task-dispatch facility.
//!
//! The registry never delivers synchronously. It describes each delivery as a
//! [`DeliveryTask`] and hands it to a [`TaskDispatcher`]; whoever runs the
//! owning sequence later feeds the task back to `VisitedRegistry::run_delivery`.
//! Tasks carry no observer references, so a task outliving its observers is
//! harmless.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::DispatchTarget;
use crate::uri::LinkUri;

/// One scheduled "mark visited" delivery for a `(uri, target)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryTask {
    /// URI whose observers should be marked visited.
    pub uri: LinkUri,
    /// Context whose observers this delivery handles.
    pub target: DispatchTarget,
}

impl DeliveryTask {
    /// Creates a delivery task.
    #[must_use]
    pub const fn new(uri: LinkUri, target: DispatchTarget) -> Self {
        Self { uri, target }
    }
}

/// Schedules delivery tasks for later execution.
///
/// Tasks scheduled on the same target must run in submission order. Nothing is
/// guaranteed across targets.
pub trait TaskDispatcher: Send + Sync {
    /// Queues `task` to run later on its target.
    fn schedule(&self, task: DeliveryTask);
}

/// FIFO dispatcher whose queue is drained by the host.
///
/// `take_all` yields everything in submission order. `take_for` drains a single
/// target, letting a host (or a test) advance contexts independently.
#[derive(Debug, Default)]
pub struct QueueDispatcher {
    queue: Mutex<VecDeque<DeliveryTask>>,
}

impl QueueDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued task in submission order.
    #[must_use]
    pub fn take_all(&self) -> Vec<DeliveryTask> {
        self.queue().drain(..).collect()
    }

    /// Removes and returns the tasks queued for `target`, in submission order.
    ///
    /// Tasks for other targets stay queued in their original order.
    #[must_use]
    pub fn take_for(&self, target: DispatchTarget) -> Vec<DeliveryTask> {
        let mut queue = self.queue();
        let (taken, kept): (VecDeque<_>, VecDeque<_>) =
            queue.drain(..).partition(|task| task.target == target);
        *queue = kept;
        taken.into()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Tasks are plain data; a poisoned lock still guards a consistent queue.
    fn queue(&self) -> MutexGuard<'_, VecDeque<DeliveryTask>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskDispatcher for QueueDispatcher {
    fn schedule(&self, task: DeliveryTask) {
        tracing::trace!(uri = %task.uri, target = %task.target, "visited.dispatch.schedule");
        self.queue().push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::context::ContextId;

    fn task(uri: &str, target: DispatchTarget) -> DeliveryTask {
        DeliveryTask::new(LinkUri::parse(uri).unwrap(), target)
    }

    #[test]
    fn test_take_all_preserves_submission_order() {
        let dispatcher = QueueDispatcher::new();
        let ctx = DispatchTarget::Context(ContextId::new());
        dispatcher.schedule(task("https://a.test/", ctx));
        dispatcher.schedule(task("https://b.test/", DispatchTarget::Global));
        dispatcher.schedule(task("https://c.test/", ctx));

        let uris: Vec<String> = dispatcher
            .take_all()
            .into_iter()
            .map(|t| t.uri.to_string())
            .collect();
        assert_eq!(uris, ["https://a.test/", "https://b.test/", "https://c.test/"]);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_take_for_leaves_other_targets_queued() {
        let dispatcher = QueueDispatcher::new();
        let a = DispatchTarget::Context(ContextId::new());
        let b = DispatchTarget::Context(ContextId::new());
        dispatcher.schedule(task("https://1.test/", a));
        dispatcher.schedule(task("https://2.test/", b));
        dispatcher.schedule(task("https://3.test/", a));
        dispatcher.schedule(task("https://4.test/", b));

        let for_a = dispatcher.take_for(a);
        assert_eq!(for_a.len(), 2);
        assert_eq!(for_a[0].uri.as_str(), "https://1.test/");
        assert_eq!(for_a[1].uri.as_str(), "https://3.test/");

        let rest = dispatcher.take_all();
        assert_eq!(rest.len(), 2);
        assert!(rest.iter().all(|t| t.target == b));
        assert_eq!(rest[0].uri.as_str(), "https://2.test/");
    }

    #[test]
    fn test_poisoned_queue_keeps_tasks() {
        let dispatcher = Arc::new(QueueDispatcher::new());
        dispatcher.schedule(task("https://a.test/", DispatchTarget::Global));

        let holder = dispatcher.clone();
        let joined = std::thread::spawn(move || {
            let _guard = holder.queue.lock().unwrap();
            panic!("panicked while holding the queue");
        })
        .join();
        assert!(joined.is_err());
        assert!(dispatcher.queue.is_poisoned());

        dispatcher.schedule(task("https://b.test/", DispatchTarget::Global));
        assert_eq!(dispatcher.len(), 2);
        let uris: Vec<String> = dispatcher
            .take_all()
            .into_iter()
            .map(|t| t.uri.to_string())
            .collect();
        assert_eq!(uris, ["https://a.test/", "https://b.test/"]);
    }
}
