//! Visited fan-out and the delivery landing handler.

use std::collections::HashSet;
use std::sync::Arc;

use crate::context::DispatchTarget;
use crate::dispatch::DeliveryTask;
use crate::error::MisuseError;
use crate::observer::LinkObserver;
use crate::uri::LinkUri;

use super::VisitedRegistry;

impl VisitedRegistry {
    /// Records that the store found `uri` visited.
    ///
    /// Schedules one delivery per distinct owning context among the current
    /// observers. Untracked URIs are ignored; nothing is remembered for them.
    /// A keep-alive hold on `uri` ends here, since its lookup has answered.
    pub fn notify_visited(&mut self, uri: &LinkUri) {
        if self.check_sequence("notify_visited").is_err() {
            return;
        }
        if self.keep_alive.remove(uri).is_some() {
            tracing::debug!(%uri, "visited.registry.keep_alive_answered");
        }

        let Some(entry) = self.entries.get_mut(uri) else {
            tracing::trace!(%uri, "visited.registry.notify_untracked");
            return;
        };
        entry.known_visited = true;
        entry.kept_alive = false;

        // A dangling handle maps to the global target, where delivery prunes it.
        let mut seen = HashSet::with_capacity(1);
        let targets: Vec<DispatchTarget> = entry
            .observers
            .iter()
            .map(|observer| DispatchTarget::for_context(observer.owning_context().flatten()))
            .filter(|target| seen.insert(*target))
            .collect();

        for target in targets {
            self.schedule_delivery(uri, target);
        }
    }

    /// Runs one delivery task on the current sequence.
    ///
    /// Marks every observer of `task.uri` whose owning context matches
    /// `task.target` as visited and stops tracking it. The entry may have
    /// changed or vanished since the task was scheduled; a missing entry is a
    /// no-op. An entry left without observers is dropped without cancelling,
    /// since its lookup already answered.
    ///
    /// Observers are called only after the entry has been restructured.
    pub fn run_delivery(&mut self, task: &DeliveryTask) {
        if self.check_sequence("run_delivery").is_err() {
            return;
        }
        self.stats.deliveries_run += 1;

        let Some(entry) = self.entries.get_mut(&task.uri) else {
            self.stats.deliveries_missed += 1;
            tracing::trace!(uri = %task.uri, target = %task.target, "visited.registry.delivery_missed");
            return;
        };

        // Walk backwards so removals never shift an unvisited position.
        let mut matched: Vec<Arc<dyn LinkObserver>> = Vec::new();
        let mut dangling = 0usize;
        let mut index = entry.observers.len();
        while index > 0 {
            index -= 1;
            let Some(observer) = entry.observers[index].upgrade() else {
                entry.observers.remove(index);
                dangling += 1;
                continue;
            };
            if DispatchTarget::for_context(observer.owning_context()) == task.target {
                entry.observers.remove(index);
                matched.push(observer);
            }
        }

        if entry.observers.is_empty() {
            self.entries.remove(&task.uri);
            tracing::debug!(uri = %task.uri, "visited.registry.prune");
        }
        self.debug_check_invariants();

        tracing::trace!(
            uri = %task.uri,
            target = %task.target,
            notified = matched.len(),
            "visited.registry.deliver"
        );
        self.stats.observers_notified += matched.len() as u64;
        for observer in matched {
            observer.mark_visited();
        }

        for _ in 0..dangling {
            let _ = self.report_misuse(MisuseError::DanglingObserver {
                uri: task.uri.clone(),
            });
        }
    }

    pub(super) fn schedule_delivery(&mut self, uri: &LinkUri, target: DispatchTarget) {
        self.stats.deliveries_scheduled += 1;
        self.dispatcher.schedule(DeliveryTask::new(uri.clone(), target));
    }
}
