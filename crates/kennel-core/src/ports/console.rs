//! Live console listener port.
//!
//! A listener is anything a remote observer can be reached through (a
//! websocket writer task, an SSE stream, a test collector). The broadcast hub
//! only needs a non-blocking "accept these bytes" operation from it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;

/// Opaque handle returned when a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a process-wide unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Why a listener refused a write. Either way the hub drops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ListenerError {
    /// The receiving side has gone away.
    #[error("listener closed")]
    Closed,

    /// The listener cannot keep up and would block the hub.
    #[error("listener is lagging")]
    Lagging,
}

/// Port for a remote console observer.
///
/// Implementations must never block: a listener that cannot take the chunk
/// right now returns [`ListenerError::Lagging`] and is unregistered.
pub trait ConsoleListener: Send + Sync {
    /// Offer a chunk of console output to the observer.
    fn send(&self, chunk: &[u8]) -> Result<(), ListenerError>;
}

impl ConsoleListener for mpsc::Sender<Vec<u8>> {
    fn send(&self, chunk: &[u8]) -> Result<(), ListenerError> {
        self.try_send(chunk.to_vec()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ListenerError::Lagging,
            mpsc::error::TrySendError::Closed(_) => ListenerError::Closed,
        })
    }
}
