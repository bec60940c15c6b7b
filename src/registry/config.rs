//! Registry configuration and counters.

use serde::{Deserialize, Serialize};

/// What the registry does when a caller violates the registration contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisusePolicy {
    /// Fail loudly. Default in debug and test builds.
    Panic,
    /// Log the violation, leave state unchanged, and continue.
    Log,
}

impl Default for MisusePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Log
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How contract violations are reported.
    pub misuse_policy: MisusePolicy,
    /// Number of URIs to reserve room for up front.
    pub initial_capacity: usize,
    /// Cancel outstanding lookups when the registry is shut down.
    pub cancel_on_shutdown: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            misuse_policy: MisusePolicy::default(),
            initial_capacity: 64,
            cancel_on_shutdown: true,
        }
    }
}

impl RegistryConfig {
    /// Default configuration with misuse logged instead of panicking.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            misuse_policy: MisusePolicy::Log,
            ..Self::default()
        }
    }
}

/// Monotonic counters describing registry activity.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub lookups_started: u64,
    pub lookup_failures: u64,
    pub cancellations_requested: u64,
    pub deliveries_scheduled: u64,
    pub deliveries_run: u64,
    /// Deliveries that found no entry for their URI.
    pub deliveries_missed: u64,
    pub observers_notified: u64,
    pub misuse_reports: u64,
}
