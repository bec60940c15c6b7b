//! Channel carrying positive lookup answers from a store to the host.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::uri::LinkUri;

/// Creates a connected signaller/receiver pair.
#[must_use]
pub fn visited_signal_channel() -> (VisitedSignaller, VisitedSignals) {
    let (tx, rx) = unbounded::<LinkUri>();
    (VisitedSignaller { tx }, VisitedSignals { rx })
}

/// Store-side sender of "this URI is visited" answers.
#[derive(Debug, Clone)]
pub struct VisitedSignaller {
    tx: Sender<LinkUri>,
}

impl VisitedSignaller {
    /// Reports `uri` as visited. Returns false if the receiving side is gone.
    pub fn signal(&self, uri: LinkUri) -> bool {
        self.tx.send(uri).is_ok()
    }
}

/// Host-side receiver of visited answers.
#[derive(Debug)]
pub struct VisitedSignals {
    rx: Receiver<LinkUri>,
}

impl VisitedSignals {
    /// Takes every answer queued so far, in arrival order, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<LinkUri> {
        self.rx.try_iter().collect()
    }

    /// Waits up to `timeout` for the next answer.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<LinkUri> {
        match self.rx.recv_timeout(timeout) {
            Ok(uri) => Some(uri),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of answers waiting to be drained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no answers are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
