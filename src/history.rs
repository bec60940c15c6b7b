//! Host glue tying a store, a dispatcher and the registry together.
//!
//! `VisitedLinks` plays the role of the owning sequence: it feeds store answers
//! into the registry and runs queued deliveries. Embedders with their own event
//! loop can drive `VisitedRegistry` directly instead.

use std::sync::Arc;

use crate::context::DispatchTarget;
use crate::dispatch::QueueDispatcher;
use crate::registry::{RegistryConfig, VisitedRegistry};
use crate::store::{MemoryVisitedStore, VisitedSignals, VisitedStore};

// Deliveries never schedule deliveries, so a pump settles in a couple of
// rounds; the cap only guards against a store that signals forever.
const MAX_PUMP_ROUNDS: usize = 64;

/// What one pump did.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub signals: usize,
    pub deliveries: usize,
}

impl PumpReport {
    /// Returns true if the pump found nothing to do.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.signals == 0 && self.deliveries == 0
    }
}

/// Visited-link tracking for one history subsystem.
#[derive(Debug)]
pub struct VisitedLinks {
    registry: VisitedRegistry,
    dispatcher: Arc<QueueDispatcher>,
    signals: VisitedSignals,
}

impl VisitedLinks {
    /// Builds tracking on top of `store`, whose answers arrive on `signals`.
    #[must_use]
    pub fn new(cfg: RegistryConfig, store: Arc<dyn VisitedStore>, signals: VisitedSignals) -> Self {
        let dispatcher = Arc::new(QueueDispatcher::new());
        let registry = VisitedRegistry::new(cfg, store, dispatcher.clone());
        Self {
            registry,
            dispatcher,
            signals,
        }
    }

    /// Builds tracking backed by a fresh [`MemoryVisitedStore`].
    #[must_use]
    pub fn in_memory(cfg: RegistryConfig) -> (Self, Arc<MemoryVisitedStore>) {
        let (store, signals) = MemoryVisitedStore::new();
        let store = Arc::new(store);
        (Self::new(cfg, store.clone(), signals), store)
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &VisitedRegistry {
        &self.registry
    }

    /// The registry, for registering and unregistering observers.
    pub fn registry_mut(&mut self) -> &mut VisitedRegistry {
        &mut self.registry
    }

    /// Deliveries waiting to run.
    #[must_use]
    pub fn pending_deliveries(&self) -> usize {
        self.dispatcher.len()
    }

    /// Feeds store answers to the registry and runs every queued delivery,
    /// until neither produces more work.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        for _ in 0..MAX_PUMP_ROUNDS {
            let round = self.pump_round(None);
            if round.is_idle() {
                break;
            }
            report.signals += round.signals;
            report.deliveries += round.deliveries;
        }
        report
    }

    /// Like [`pump`](Self::pump) for a single round, but only runs deliveries
    /// queued for `target`. Other targets keep their tasks.
    pub fn pump_context(&mut self, target: DispatchTarget) -> PumpReport {
        self.pump_round(Some(target))
    }

    fn pump_round(&mut self, target: Option<DispatchTarget>) -> PumpReport {
        let answers = self.signals.drain();
        for uri in &answers {
            self.registry.notify_visited(uri);
        }

        let tasks = match target {
            Some(target) => self.dispatcher.take_for(target),
            None => self.dispatcher.take_all(),
        };
        for task in &tasks {
            self.registry.run_delivery(task);
        }

        if !answers.is_empty() || !tasks.is_empty() {
            tracing::trace!(
                signals = answers.len(),
                deliveries = tasks.len(),
                "visited.history.pump"
            );
        }
        PumpReport {
            signals: answers.len(),
            deliveries: tasks.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::context::ContextId;
    use crate::observer::{LinkObserver, ObserverHandle};
    use crate::uri::LinkUri;

    struct Anchor {
        context: Option<ContextId>,
        visited: AtomicBool,
    }

    impl LinkObserver for Anchor {
        fn owning_context(&self) -> Option<ContextId> {
            self.context
        }

        fn mark_visited(&self) {
            self.visited.store(true, Ordering::SeqCst);
        }
    }

    fn anchor(context: Option<ContextId>) -> Arc<Anchor> {
        Arc::new(Anchor {
            context,
            visited: AtomicBool::new(false),
        })
    }

    #[test]
    fn test_pump_settles_lookup_into_visited_state() {
        let (mut links, store) = VisitedLinks::in_memory(RegistryConfig::default());
        let uri = LinkUri::parse("https://a.test/").unwrap();
        store.record_visit(&uri);
        let a = anchor(Some(ContextId::new()));

        // The visit announcement arrives before anyone tracks the URI.
        assert_eq!(links.pump().signals, 1);

        links.registry_mut().register(&uri, ObserverHandle::new(&a)).unwrap();
        assert!(!a.visited.load(Ordering::SeqCst));

        store.resolve_pending();
        let report = links.pump();
        assert_eq!(report, PumpReport { signals: 1, deliveries: 1 });
        assert!(a.visited.load(Ordering::SeqCst));
        assert!(links.registry().is_empty());
        assert!(links.pump().is_idle());
    }

    #[test]
    fn test_unvisited_uri_stays_tracked() {
        let (mut links, store) = VisitedLinks::in_memory(RegistryConfig::default());
        let uri = LinkUri::parse("https://never.test/").unwrap();
        let a = anchor(None);
        links.registry_mut().register(&uri, ObserverHandle::new(&a)).unwrap();

        store.resolve_pending();
        assert!(links.pump().is_idle());
        assert!(links.registry().is_tracked(&uri));
        assert!(!a.visited.load(Ordering::SeqCst));
    }

    #[test]
    fn test_pump_context_leaves_other_contexts_queued() {
        let (mut links, store) = VisitedLinks::in_memory(RegistryConfig::default());
        let uri = LinkUri::parse("https://a.test/").unwrap();
        let (c1, c2) = (ContextId::new(), ContextId::new());
        let (a, b) = (anchor(Some(c1)), anchor(Some(c2)));
        links.registry_mut().register(&uri, ObserverHandle::new(&a)).unwrap();
        links.registry_mut().register(&uri, ObserverHandle::new(&b)).unwrap();

        store.record_visit(&uri);
        let report = links.pump_context(DispatchTarget::Context(c2));
        assert_eq!(report, PumpReport { signals: 1, deliveries: 1 });
        assert!(b.visited.load(Ordering::SeqCst));
        assert!(!a.visited.load(Ordering::SeqCst));
        assert_eq!(links.pending_deliveries(), 1);

        links.pump();
        assert!(a.visited.load(Ordering::SeqCst));
    }
}
