//! One-shot completion signal with any number of waiters.

use tokio::sync::watch;

/// Set once when a process has been reaped; every waiter, early or late,
/// observes the same exit code.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    // `None` while pending, `Some(exit_code)` once complete.
    tx: watch::Sender<Option<Option<i32>>>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    /// A pending signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// An already completed signal, for "nothing was ever spawned".
    pub fn completed() -> Self {
        let (tx, _rx) = watch::channel(Some(None));
        Self { tx }
    }

    /// Mark complete. Only the first call has any effect; returns whether
    /// this call was it.
    pub fn complete(&self, exit_code: Option<i32>) -> bool {
        self.tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(exit_code);
            true
        })
    }

    pub fn is_complete(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Wait until complete and return the exit code.
    pub async fn wait(&self) -> Option<i32> {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        match rx.wait_for(Option::is_some).await {
            Ok(state) => state.flatten(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_waiter_sees_first_completion() {
        let signal = CompletionSignal::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.wait().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(signal.complete(Some(7)));
        assert!(!signal.complete(Some(9)));

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Some(7));
        }
        // Late waiters return immediately.
        assert_eq!(signal.wait().await, Some(7));
    }

    #[tokio::test]
    async fn test_completed_constructor_does_not_block() {
        let signal = CompletionSignal::completed();
        assert!(signal.is_complete());
        assert_eq!(signal.wait().await, None);
    }
}
