//! Bounded, epoch-indexed console history.

use kennel_core::ConsoleSnapshot;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use super::ConsoleSink;

/// Lines retained when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Default)]
struct Inner {
    lines: VecDeque<(u64, String)>,
    next_epoch: u64,
}

/// Ring buffer of console lines.
///
/// Every line is stamped with an epoch taken from a counter that only moves
/// forward, so a poller can ask for "everything since the epoch I saw last"
/// even after older lines were evicted.
#[derive(Debug)]
pub struct ConsoleBuffer {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ConsoleBuffer {
    /// A zero capacity is treated as one line.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(Inner {
                lines: VecDeque::with_capacity(capacity),
                next_epoch: 0,
            }),
            capacity,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one line.
    pub fn push_line(&self, line: impl Into<String>) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let epoch = inner.next_epoch;
        inner.next_epoch += 1;
        if inner.lines.len() >= self.capacity {
            inner.lines.pop_front();
        }
        inner.lines.push_back((epoch, line.into()));
    }

    /// Append every line in `chunk`, decoding lossily and dropping line
    /// terminators.
    pub fn write(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let chunk = chunk.strip_suffix(b"\n").unwrap_or(chunk);
        for line in chunk.split(|b| *b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            self.push_line(String::from_utf8_lossy(line));
        }
    }

    /// Everything retained plus the epoch to poll from next.
    pub fn read(&self) -> ConsoleSnapshot {
        self.read_from(0)
    }

    /// Retained lines stamped `epoch` or later.
    pub fn read_from(&self, epoch: u64) -> ConsoleSnapshot {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        ConsoleSnapshot {
            lines: inner
                .lines
                .iter()
                .filter(|(e, _)| *e >= epoch)
                .map(|(_, line)| line.clone())
                .collect(),
            epoch: inner.next_epoch,
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConsoleSink for ConsoleBuffer {
    fn write(&self, chunk: &[u8]) {
        Self::write(self, chunk);
    }
}
