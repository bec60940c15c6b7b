//! Error types for the visited-link registry.
//!
//! All errors are strongly typed using thiserror. Only lookup-start failures
//! are recoverable runtime errors; misuse of the registry contract is reported
//! through [`MisuseError`] and routed by the configured misuse policy.

use thiserror::Error;

use crate::uri::LinkUri;

/// Validation errors that occur during input validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("URI cannot be empty")]
    EmptyUri,
}

/// Errors a visited-status store reports when it cannot begin a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Visited store unavailable: {reason}")]
    Unavailable {
        reason: String,
    },

    #[error("Lookup for {uri} rejected: {reason}")]
    Rejected {
        uri: LinkUri,
        reason: String,
    },
}

/// Violations of the registration contract.
///
/// Correct callers never trigger these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MisuseError {
    #[error("Observer already registered for {uri}")]
    DuplicateObserver {
        uri: LinkUri,
    },

    #[error("Trying to unregister URI that wasn't registered: {uri}")]
    UnknownUri {
        uri: LinkUri,
    },

    #[error("Trying to unregister observer that wasn't registered for {uri}")]
    UnknownObserver {
        uri: LinkUri,
    },

    #[error("Observer for {uri} was dropped without being unregistered")]
    DanglingObserver {
        uri: LinkUri,
    },

    #[error("Registry used off its owning sequence during {operation}")]
    WrongSequence {
        operation: &'static str,
    },
}

/// Top-level error type for the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisitedError {
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Misuse: {0}")]
    Misuse(#[from] MisuseError),
}

impl VisitedError {
    /// Returns true if the store failed to start a lookup.
    #[must_use]
    pub const fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }

    /// Returns true if this is a contract violation by the caller.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self, Self::Misuse(_))
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Lookup(LookupError::Unavailable { .. }))
    }
}

/// Result type alias for registry operations.
pub type VisitedResult<T> = Result<T, VisitedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_message() {
        let err = LookupError::Rejected {
            uri: LinkUri::parse("https://example.org/").unwrap(),
            reason: "quota".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("https://example.org/"));
        assert!(msg.contains("quota"));
    }

    #[test]
    fn test_misuse_error_message() {
        let err = MisuseError::UnknownUri {
            uri: LinkUri::parse("https://a.test/").unwrap(),
        };
        assert!(format!("{err}").contains("wasn't registered"));
    }

    #[test]
    fn test_visited_error_from_lookup() {
        let err: VisitedError = LookupError::Unavailable {
            reason: "closed".to_string(),
        }
        .into();
        assert!(err.is_lookup());
        assert!(err.is_retryable());
        assert!(!err.is_misuse());
    }

    #[test]
    fn test_visited_error_from_misuse() {
        let err: VisitedError = MisuseError::DuplicateObserver {
            uri: LinkUri::parse("https://a.test/").unwrap(),
        }
        .into();
        assert!(err.is_misuse());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rejected_lookup_not_retryable() {
        let err: VisitedError = LookupError::Rejected {
            uri: LinkUri::parse("https://a.test/").unwrap(),
            reason: "blocked scheme".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(err.is_lookup());
    }
}
