//! Tracking of the single live process an environment may own.

use kennel_core::{EnvironmentError, WaitOutcome};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use crate::process::{CompletionSignal, kill_group, process_running};

struct Tracked<W> {
    generation: u64,
    pid: u32,
    input: W,
}

/// The tracked process handle, its input stream and its completion signal.
///
/// Every spawn bumps a generation counter. The reaper of an older spawn can
/// therefore never clear the handle of a newer one.
pub(crate) struct ProcessSlot<W> {
    tracked: Mutex<Option<Tracked<W>>>,
    completion: Mutex<CompletionSignal>,
    generation: AtomicU64,
    started: AtomicBool,
}

impl<W: Clone> ProcessSlot<W> {
    pub(crate) fn new() -> Self {
        Self {
            tracked: Mutex::new(None),
            completion: Mutex::new(CompletionSignal::completed()),
            generation: AtomicU64::new(0),
            started: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Tracked<W>>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a freshly spawned process.
    pub(crate) fn begin(&self, pid: u32, input: W) -> (u64, CompletionSignal) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let signal = CompletionSignal::new();
        *self
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = signal.clone();
        *self.lock() = Some(Tracked {
            generation,
            pid,
            input,
        });
        self.started.store(true, Ordering::SeqCst);
        (generation, signal)
    }

    /// Stop tracking the process of `generation` as soon as it is reaped, so
    /// its PID is never probed or signalled after the OS may reuse it.
    pub(crate) fn release(&self, generation: u64) {
        let mut tracked = self.lock();
        if tracked.as_ref().is_some_and(|t| t.generation == generation) {
            *tracked = None;
        }
    }

    /// Called by the reaper of `generation` once the process has exited and
    /// its output has drained.
    pub(crate) fn finish(&self, generation: u64, signal: &CompletionSignal, exit_code: Option<i32>) {
        self.release(generation);
        signal.complete(exit_code);
        debug!(generation, ?exit_code, "process reaped");
    }

    /// Whether an input stream was ever established.
    pub(crate) fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// PID of the tracked process, alive or not.
    pub(crate) fn tracked_pid(&self) -> Option<u32> {
        self.lock().as_ref().map(|t| t.pid)
    }

    /// PID of the tracked process if it is alive right now.
    pub(crate) fn live_pid(&self) -> Option<u32> {
        self.tracked_pid().filter(|pid| process_running(*pid))
    }

    /// Input stream of the live process.
    pub(crate) fn input(&self) -> Result<W, EnvironmentError> {
        if !self.has_started() {
            return Err(EnvironmentError::NotStarted);
        }
        let tracked = self.lock();
        match tracked.as_ref() {
            Some(t) if process_running(t.pid) => Ok(t.input.clone()),
            _ => Err(EnvironmentError::NotRunning),
        }
    }

    /// SIGKILL the live process with its process group and stop tracking it.
    /// No-op when nothing is running; the reaper still reaps and signals
    /// completion.
    pub(crate) fn kill(&self) -> Result<(), EnvironmentError> {
        let mut tracked = self.lock();
        let Some(pid) = tracked.as_ref().map(|t| t.pid) else {
            return Ok(());
        };
        if !process_running(pid) {
            return Ok(());
        }
        kill_group(pid)?;
        *tracked = None;
        warn!(pid, "process killed");
        Ok(())
    }

    /// Wait for the current process, killing it once `timeout` elapses.
    /// A zero `timeout` waits indefinitely.
    pub(crate) async fn wait(&self, timeout: Duration) -> Result<WaitOutcome, EnvironmentError> {
        let signal = self
            .completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if timeout.is_zero() {
            return Ok(WaitOutcome::Completed {
                exit_code: signal.wait().await,
            });
        }

        tokio::select! {
            exit_code = signal.wait() => Ok(WaitOutcome::Completed { exit_code }),
            () = tokio::time::sleep(timeout) => {
                self.kill()?;
                signal.wait().await;
                Ok(WaitOutcome::TimedOut)
            }
        }
    }
}
