//! In-memory visited store.
//!
//! Thread-safe reference implementation of [`VisitedStore`] for embedded usage
//! and tests. Lookups stay pending until [`MemoryVisitedStore::resolve_pending`]
//! answers them, which stands in for the asynchronous database query.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::LookupError;
use crate::uri::LinkUri;

use super::signals::{visited_signal_channel, VisitedSignaller, VisitedSignals};
use super::traits::{CancelOutcome, LookupHandle, VisitedStore};

fn lock_err(context: &'static str) -> LookupError {
    LookupError::Unavailable {
        reason: format!("poisoned lock: {context}"),
    }
}

#[derive(Debug, Default)]
struct StoreState {
    visited: HashSet<LinkUri>,
    pending: HashMap<LinkUri, LookupHandle>,
    fail_next: usize,
    decline_cancellations: bool,
}

/// In-memory [`VisitedStore`].
#[derive(Debug)]
pub struct MemoryVisitedStore {
    state: Mutex<StoreState>,
    signaller: VisitedSignaller,
    lookups_started: AtomicU64,
    cancellations: AtomicU64,
}

impl MemoryVisitedStore {
    /// Creates an empty store and the receiver for its visited answers.
    #[must_use]
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (Self, VisitedSignals) {
        let (signaller, signals) = visited_signal_channel();
        (Self::with_signaller(signaller), signals)
    }

    /// Creates an empty store reporting through an existing signaller.
    #[must_use]
    pub fn with_signaller(signaller: VisitedSignaller) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            signaller,
            lookups_started: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
        }
    }

    /// Records a visit to `uri` and reports it as visited.
    ///
    /// A pending lookup for `uri` resolves immediately. The answer is reported
    /// even when nobody asked, mirroring a history database announcing new
    /// visits; receivers ignore URIs they do not track.
    pub fn record_visit(&self, uri: &LinkUri) {
        if let Ok(mut state) = self.state.lock() {
            state.visited.insert(uri.clone());
            state.pending.remove(uri);
        }
        self.signaller.signal(uri.clone());
    }

    /// Returns true if `uri` has a recorded visit.
    #[must_use]
    pub fn is_visited(&self, uri: &LinkUri) -> bool {
        self.state
            .lock()
            .map(|state| state.visited.contains(uri))
            .unwrap_or(false)
    }

    /// Answers every pending lookup.
    ///
    /// Visited URIs are reported through the signal channel; the rest are
    /// dropped silently. Returns the URIs reported, in no particular order.
    pub fn resolve_pending(&self) -> Vec<LinkUri> {
        let reported: Vec<LinkUri> = {
            let Ok(mut state) = self.state.lock() else {
                return Vec::new();
            };
            let pending = std::mem::take(&mut state.pending);
            pending
                .into_keys()
                .filter(|uri| state.visited.contains(uri))
                .collect()
        };

        for uri in &reported {
            self.signaller.signal(uri.clone());
        }
        reported
    }

    /// Makes the next `count` calls to `start_lookup` fail.
    pub fn fail_next_lookups(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = count;
        }
    }

    /// When set, cancellation requests for pending lookups are declined.
    pub fn set_decline_cancellations(&self, decline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.decline_cancellations = decline;
        }
    }

    /// Returns true if a lookup for `uri` is pending.
    #[must_use]
    pub fn is_pending(&self, uri: &LinkUri) -> bool {
        self.state
            .lock()
            .map(|state| state.pending.contains_key(uri))
            .unwrap_or(false)
    }

    /// Number of lookups currently pending.
    #[must_use]
    pub fn pending_lookups(&self) -> usize {
        self.state.lock().map(|state| state.pending.len()).unwrap_or(0)
    }

    /// Number of successful `start_lookup` calls.
    #[must_use]
    pub fn lookups_started(&self) -> u64 {
        self.lookups_started.load(Ordering::Relaxed)
    }

    /// Number of `cancel_lookup` calls, whatever their outcome.
    #[must_use]
    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }
}

impl VisitedStore for MemoryVisitedStore {
    fn start_lookup(&self, uri: &LinkUri) -> Result<LookupHandle, LookupError> {
        let mut state = self.state.lock().map_err(|_| lock_err("store.start_lookup"))?;

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(LookupError::Rejected {
                uri: uri.clone(),
                reason: "injected lookup failure".to_string(),
            });
        }

        let handle = *state.pending.entry(uri.clone()).or_default();
        self.lookups_started.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    fn cancel_lookup(&self, uri: &LinkUri) -> CancelOutcome {
        self.cancellations.fetch_add(1, Ordering::Relaxed);

        let Ok(mut state) = self.state.lock() else {
            return CancelOutcome::NotPending;
        };
        if !state.pending.contains_key(uri) {
            return CancelOutcome::NotPending;
        }
        if state.decline_cancellations {
            return CancelOutcome::Declined;
        }
        state.pending.remove(uri);
        CancelOutcome::Cancelled
    }
}
