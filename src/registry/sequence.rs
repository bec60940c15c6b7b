//! Single-writer sequence check.

use std::thread::{self, ThreadId};

/// Remembers the thread that owns the registry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SequenceChecker {
    owner: ThreadId,
}

impl SequenceChecker {
    /// Binds to the calling thread.
    pub(crate) fn new() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub(crate) fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_thread_owns() {
        assert!(SequenceChecker::new().is_current());
    }

    #[test]
    fn test_other_thread_does_not_own() {
        let checker = SequenceChecker::new();
        let elsewhere = thread::spawn(move || checker.is_current()).join().unwrap();
        assert!(!elsewhere);
    }
}
