//! Visited-link registry.
//!
//! The registry maps each tracked URI to the observers interested in it. It
//! starts exactly one store lookup per tracked URI, cancels it once nobody is
//! tracking the URI anymore, and turns positive answers into one scheduled
//! delivery per owning context.
//!
//! All mutation happens through `&mut self` on the thread that created the
//! registry. Observer callbacks only run inside [`VisitedRegistry::run_delivery`],
//! after the registry has finished restructuring the entry, so an observer can
//! never re-enter the registry while it is iterating.

/// Configuration, misuse policy and counters.
pub mod config;
mod delivery;
mod sequence;

use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::context::DispatchTarget;
use crate::dispatch::TaskDispatcher;
use crate::error::{MisuseError, VisitedError, VisitedResult};
use crate::observer::ObserverHandle;
use crate::store::{LookupHandle, VisitedStore};
use crate::uri::LinkUri;

pub use config::{MisusePolicy, RegistryConfig, RegistryStats};

use sequence::SequenceChecker;

/// Per-URI record of observers and learned visited status.
///
/// Never stored with an empty observer list.
#[derive(Debug)]
struct TrackedEntry {
    observers: Vec<ObserverHandle>,
    known_visited: bool,
    lookup: LookupHandle,
    // Also wanted by a remote owner; outlives the last local observer.
    kept_alive: bool,
}

impl TrackedEntry {
    fn new(lookup: LookupHandle, kept_alive: bool) -> Self {
        Self {
            observers: Vec::new(),
            known_visited: false,
            lookup,
            kept_alive,
        }
    }
}

/// Process-wide URI to observer registry.
///
/// Constructed once by the owning history subsystem and passed by reference to
/// whatever drives the store and the dispatcher.
pub struct VisitedRegistry {
    cfg: RegistryConfig,
    store: Arc<dyn VisitedStore>,
    dispatcher: Arc<dyn TaskDispatcher>,
    entries: HashMap<LinkUri, TrackedEntry>,
    // Lookups held for a remote owner with no local observer. Never overlaps
    // `entries`.
    keep_alive: HashMap<LinkUri, LookupHandle>,
    stats: RegistryStats,
    sequence: SequenceChecker,
}

impl VisitedRegistry {
    /// Creates an empty registry owned by the calling thread.
    #[must_use]
    pub fn new(
        cfg: RegistryConfig,
        store: Arc<dyn VisitedStore>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> Self {
        let entries = HashMap::with_capacity(cfg.initial_capacity);
        Self {
            cfg,
            store,
            dispatcher,
            entries,
            keep_alive: HashMap::new(),
            stats: RegistryStats::default(),
            sequence: SequenceChecker::new(),
        }
    }

    /// Starts tracking `observer` for `uri`.
    ///
    /// The first registration for a URI starts a store lookup; later ones share
    /// it. If the URI is already known visited, one delivery for the observer's
    /// context is scheduled instead of touching the observer here.
    ///
    /// `observer` must stay alive until it is unregistered for `uri`.
    ///
    /// # Errors
    /// - `VisitedError::Lookup` if the store cannot start the lookup. No entry
    ///   is left behind.
    /// - `VisitedError::Misuse` if `observer` is already registered for `uri`
    ///   (panics instead under `MisusePolicy::Panic`).
    pub fn register(&mut self, uri: &LinkUri, observer: ObserverHandle) -> VisitedResult<()> {
        self.check_sequence("register")?;

        let duplicate = self
            .entries
            .get(uri)
            .is_some_and(|entry| entry.observers.contains(&observer));
        if duplicate {
            return Err(self.report_misuse(MisuseError::DuplicateObserver { uri: uri.clone() }));
        }

        let target = DispatchTarget::for_context(observer.owning_context().flatten());
        let known_visited = {
            let entry = match self.entries.entry(uri.clone()) {
                MapEntry::Occupied(slot) => slot.into_mut(),
                MapEntry::Vacant(slot) => {
                    let entry = match self.keep_alive.remove(uri) {
                        Some(lookup) => TrackedEntry::new(lookup, true),
                        None => {
                            let lookup = start_lookup(self.store.as_ref(), &mut self.stats, uri)?;
                            TrackedEntry::new(lookup, false)
                        }
                    };
                    tracing::debug!(%uri, lookup = %entry.lookup, "visited.registry.track");
                    slot.insert(entry)
                }
            };
            entry.observers.push(observer);
            entry.known_visited
        };

        // Already answered: the observer must not be mutated synchronously.
        if known_visited {
            self.schedule_delivery(uri, target);
        }

        self.debug_check_invariants();
        Ok(())
    }

    /// Makes sure a store lookup for `uri` is running without adding an
    /// observer.
    ///
    /// Used on behalf of a remote owner that tracks observers itself. No entry
    /// is created. If the URI is tracked here, the entry's lookup is shared and
    /// kept running after its last local observer leaves. Otherwise the lookup
    /// is held aside, and a later [`register`](Self::register) adopts it
    /// instead of starting another one.
    ///
    /// The hold ends when the store answers, on [`release_lookup`], or on
    /// shutdown.
    ///
    /// [`release_lookup`]: Self::release_lookup
    ///
    /// # Errors
    /// Returns `VisitedError::Lookup` if the store cannot start the lookup.
    pub fn ensure_lookup_started(&mut self, uri: &LinkUri) -> VisitedResult<()> {
        self.check_sequence("ensure_lookup_started")?;

        if let Some(entry) = self.entries.get_mut(uri) {
            entry.kept_alive = true;
            return Ok(());
        }
        if self.keep_alive.contains_key(uri) {
            return Ok(());
        }
        let lookup = start_lookup(self.store.as_ref(), &mut self.stats, uri)?;
        tracing::debug!(%uri, %lookup, "visited.registry.keep_alive");
        self.keep_alive.insert(uri.clone(), lookup);
        Ok(())
    }

    /// Drops the remote owner's interest in `uri`.
    ///
    /// If no local observer tracks the URI either, its lookup is cancelled.
    /// Releasing a URI that is not held is a no-op.
    ///
    /// # Errors
    /// Returns `VisitedError::Misuse` when called off the owning thread.
    pub fn release_lookup(&mut self, uri: &LinkUri) -> VisitedResult<()> {
        self.check_sequence("release_lookup")?;

        if let Some(entry) = self.entries.get_mut(uri) {
            entry.kept_alive = false;
        } else if self.keep_alive.remove(uri).is_some() {
            tracing::debug!(%uri, "visited.registry.release");
            self.request_cancel(uri);
        }
        Ok(())
    }

    /// Stops tracking `observer` for `uri`.
    ///
    /// Removing the last observer drops the entry and asks the store to cancel
    /// its lookup. The store may decline; that is not an error.
    ///
    /// # Errors
    /// Returns `VisitedError::Misuse` if `uri` is not tracked or `observer` is
    /// not registered for it (panics instead under `MisusePolicy::Panic`).
    pub fn unregister(&mut self, uri: &LinkUri, observer: &ObserverHandle) -> VisitedResult<()> {
        self.check_sequence("unregister")?;

        let Some(entry) = self.entries.get_mut(uri) else {
            return Err(self.report_misuse(MisuseError::UnknownUri { uri: uri.clone() }));
        };
        let Some(position) = entry.observers.iter().position(|o| o == observer) else {
            return Err(self.report_misuse(MisuseError::UnknownObserver { uri: uri.clone() }));
        };

        entry.observers.remove(position);
        if entry.observers.is_empty() {
            self.untrack(uri);
        }

        self.debug_check_invariants();
        Ok(())
    }

    /// Returns true if `uri` has at least one registered observer.
    #[must_use]
    pub fn is_tracked(&self, uri: &LinkUri) -> bool {
        self.entries.contains_key(uri)
    }

    /// Returns true if `observer` is registered for `uri`.
    #[must_use]
    pub fn contains(&self, uri: &LinkUri, observer: &ObserverHandle) -> bool {
        self.entries
            .get(uri)
            .is_some_and(|entry| entry.observers.contains(observer))
    }

    /// Number of observers registered for `uri`.
    #[must_use]
    pub fn observer_count(&self, uri: &LinkUri) -> usize {
        self.entries.get(uri).map_or(0, |entry| entry.observers.len())
    }

    /// Returns true if the store already reported `uri` as visited while it was
    /// tracked.
    #[must_use]
    pub fn is_known_visited(&self, uri: &LinkUri) -> bool {
        self.entries.get(uri).is_some_and(|entry| entry.known_visited)
    }

    /// The lookup backing a tracked URI.
    #[must_use]
    pub fn lookup_for(&self, uri: &LinkUri) -> Option<LookupHandle> {
        self.entries.get(uri).map(|entry| entry.lookup)
    }

    /// Returns true if a lookup for `uri` is held for a remote owner, with or
    /// without local observers.
    #[must_use]
    pub fn is_kept_alive(&self, uri: &LinkUri) -> bool {
        self.keep_alive.contains_key(uri)
            || self.entries.get(uri).is_some_and(|entry| entry.kept_alive)
    }

    /// Tracked URIs in sorted order.
    #[must_use]
    pub fn tracked_uris(&self) -> Vec<LinkUri> {
        let mut uris: Vec<LinkUri> = self.entries.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Number of tracked URIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no URI is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the activity counters.
    #[must_use]
    pub const fn stats(&self) -> RegistryStats {
        self.stats
    }

    /// The configuration this registry was built with.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.cfg
    }

    /// Drops every entry and keep-alive hold and, if configured, cancels their
    /// lookups.
    ///
    /// Idempotent. The registry stays usable afterwards.
    ///
    /// # Errors
    /// Returns `VisitedError::Misuse` when called off the owning thread.
    pub fn shutdown(&mut self) -> VisitedResult<()> {
        self.check_sequence("shutdown")?;
        self.teardown();
        Ok(())
    }

    fn teardown(&mut self) {
        if self.entries.is_empty() && self.keep_alive.is_empty() {
            return;
        }

        let tracked = self.entries.len();
        let mut uris: Vec<LinkUri> = self
            .entries
            .drain()
            .map(|(uri, _)| uri)
            .chain(self.keep_alive.drain().map(|(uri, _)| uri))
            .collect();
        uris.sort();
        tracing::debug!(tracked, held = uris.len() - tracked, "visited.registry.shutdown");

        if self.cfg.cancel_on_shutdown {
            for uri in &uris {
                self.request_cancel(uri);
            }
        }
    }

    fn untrack(&mut self, uri: &LinkUri) {
        let Some(entry) = self.entries.remove(uri) else {
            return;
        };
        tracing::debug!(%uri, "visited.registry.untrack");
        if entry.kept_alive {
            self.keep_alive.insert(uri.clone(), entry.lookup);
        } else {
            self.request_cancel(uri);
        }
    }

    fn request_cancel(&mut self, uri: &LinkUri) {
        self.stats.cancellations_requested += 1;
        let outcome = self.store.cancel_lookup(uri);
        tracing::debug!(%uri, ?outcome, "visited.registry.cancel_lookup");
    }

    fn check_sequence(&mut self, operation: &'static str) -> VisitedResult<()> {
        if self.sequence.is_current() {
            return Ok(());
        }
        Err(self.report_misuse(MisuseError::WrongSequence { operation }))
    }

    fn report_misuse(&mut self, err: MisuseError) -> VisitedError {
        self.stats.misuse_reports += 1;
        match self.cfg.misuse_policy {
            MisusePolicy::Panic => panic!("visited registry misuse: {err}"),
            MisusePolicy::Log => {
                tracing::error!(error = %err, "visited.registry.misuse");
            }
        }
        VisitedError::Misuse(err)
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.entries.values().all(|entry| !entry.observers.is_empty()),
            "an empty entry was kept in the registry"
        );
        debug_assert!(
            self.keep_alive.keys().all(|uri| !self.entries.contains_key(uri)),
            "a keep-alive hold overlaps a tracked entry"
        );
    }
}

impl Drop for VisitedRegistry {
    fn drop(&mut self) {
        // Skip the sequence check: the owner may be torn down from anywhere.
        self.teardown();
    }
}

impl fmt::Debug for VisitedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisitedRegistry")
            .field("cfg", &self.cfg)
            .field("entries", &self.entries)
            .field("keep_alive", &self.keep_alive)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn start_lookup(
    store: &dyn VisitedStore,
    stats: &mut RegistryStats,
    uri: &LinkUri,
) -> VisitedResult<LookupHandle> {
    match store.start_lookup(uri) {
        Ok(handle) => {
            stats.lookups_started += 1;
            Ok(handle)
        }
        Err(err) => {
            stats.lookup_failures += 1;
            tracing::warn!(%uri, error = %err, "visited.registry.lookup_failed");
            Err(err.into())
        }
    }
}
