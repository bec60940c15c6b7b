//! Abstract store trait consumed by the registry.
//!
//! Implementations own the actual history database and the lookup machinery;
//! the registry only needs to start a lookup once per tracked URI and to
//! withdraw interest when nobody is tracking the URI anymore.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LookupError;
use crate::uri::LinkUri;

/// Opaque identifier of an accepted lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupHandle(Uuid);

impl LookupHandle {
    /// Creates a new random lookup handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LookupHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LookupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a cancellation request achieved. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The pending lookup was withdrawn.
    Cancelled,
    /// No lookup was pending (resolved, already cancelled, or never started).
    NotPending,
    /// The store kept the lookup, e.g. because its answer is already in flight.
    Declined,
}

impl CancelOutcome {
    /// Returns true if the cancellation had an effect.
    #[must_use]
    pub const fn took_effect(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Storage-side half of visited tracking.
///
/// # Contract
/// - `start_lookup` begins an asynchronous visited check. A positive answer is
///   reported later through the store's signal channel; a negative answer is
///   never reported.
/// - `cancel_lookup` is advisory, must be idempotent, and must be safe to call
///   for URIs whose lookup already resolved or was never started.
pub trait VisitedStore: Send + Sync {
    /// Begin a visited lookup for `uri`.
    ///
    /// # Errors
    /// Returns a `LookupError` if the store cannot begin the lookup.
    fn start_lookup(&self, uri: &LinkUri) -> Result<LookupHandle, LookupError>;

    /// Best-effort withdrawal of the pending lookup for `uri`.
    fn cancel_lookup(&self, uri: &LinkUri) -> CancelOutcome;
}
