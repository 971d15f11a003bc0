//! Live fan-out of console output to remote observers.

use kennel_core::{ConsoleListener, ListenerId};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use super::ConsoleSink;

/// Registry of live console listeners.
///
/// A listener whose send fails is dropped on the spot; the rest of the
/// delivery continues.
#[derive(Default)]
pub struct BroadcastHub {
    listeners: Mutex<Vec<(ListenerId, Box<dyn ConsoleListener>)>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Box<dyn ConsoleListener>) -> ListenerId {
        let id = ListenerId::next();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        debug!(%id, "Console listener registered");
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unregister(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// Deliver `chunk` to every listener.
    pub fn write(&self, chunk: &[u8]) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(id, listener)| match listener.send(chunk) {
                Ok(()) => true,
                Err(e) => {
                    debug!(%id, error = %e, "Dropping console listener");
                    false
                }
            });
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ConsoleSink for BroadcastHub {
    fn write(&self, chunk: &[u8]) {
        Self::write(self, chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_write_without_listeners_is_noop() {
        let hub = BroadcastHub::new();
        hub.write(b"nobody\n");
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_failed_listeners_are_removed_others_still_receive() {
        let hub = BroadcastHub::new();
        let (live_tx, mut live_rx) = mpsc::channel::<Vec<u8>>(8);
        let (closed_tx, closed_rx) = mpsc::channel::<Vec<u8>>(8);
        let (full_tx, _full_rx) = mpsc::channel::<Vec<u8>>(1);
        hub.register(Box::new(closed_tx));
        hub.register(Box::new(live_tx));
        hub.register(Box::new(full_tx));
        drop(closed_rx);

        hub.write(b"one\n");
        hub.write(b"two\n");

        assert_eq!(hub.listener_count(), 1);
        assert_eq!(live_rx.try_recv().unwrap(), b"one\n");
        assert_eq!(live_rx.try_recv().unwrap(), b"two\n");
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let hub = BroadcastHub::new();
        let (tx, _rx) = mpsc::channel::<Vec<u8>>(8);
        let id = hub.register(Box::new(tx));

        hub.unregister(id);
        hub.unregister(id);
        assert_eq!(hub.listener_count(), 0);
    }
}
