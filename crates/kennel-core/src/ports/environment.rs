//! Environment trait definition.
//!
//! An environment is the execution context of one workload: a root directory,
//! at most one live OS process, and the console that process writes to.
//! Implementations handle all spawning, PTY and signalling details internally.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use super::EnvironmentError;
use super::console::{ConsoleListener, ListenerId};

/// Which OS-interaction strategy backs an environment.
///
/// Selected once at construction time; the two variants never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    /// Plain spawn with piped stdin/stdout/stderr.
    #[default]
    Standard,
    /// Spawn attached to a pseudo-terminal as its controlling terminal.
    Tty,
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Tty => f.write_str("tty"),
        }
    }
}

/// Result of waiting on the main process.
///
/// Exactly one outcome is produced per wait: either the process ended on its
/// own, or the wait deadline passed and the process was killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process exited (or none was running). `exit_code` is `None` when it
    /// was terminated by a signal.
    Completed { exit_code: Option<i32> },
    /// The deadline elapsed first; the process was force-killed.
    TimedOut,
}

impl WaitOutcome {
    /// True when the process exited on its own with status 0.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { exit_code: Some(0) })
    }
}

/// Resource usage of the live process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Resident set size in bytes.
    pub memory: u64,
    /// CPU utilisation in percent over the sampling window.
    pub cpu: f64,
}

/// Console contents plus the epoch to poll from next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSnapshot {
    /// Retained lines, oldest first.
    pub lines: Vec<String>,
    /// Epoch the next written line will carry.
    pub epoch: u64,
}

/// Execution context owning one workload's process and console.
///
/// # Design Rules
///
/// - At most one live process per environment
/// - `is_running` is always a live probe, never a cached flag
/// - Output is opaque bytes; no workload protocol knowledge
#[async_trait]
pub trait Environment: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> EnvironmentKind;

    /// Directory the workload lives and runs in.
    fn root_directory(&self) -> &Path;

    /// Create the root directory. Succeeds if it already exists.
    async fn create(&self) -> Result<(), EnvironmentError>;

    /// Reconcile environment-level resources. No-op unless a variant needs it.
    async fn update(&self) -> Result<(), EnvironmentError> {
        Ok(())
    }

    /// Recursively remove the root directory.
    async fn delete(&self) -> Result<(), EnvironmentError>;

    /// Spawn `command` without waiting for it.
    ///
    /// Returns `Err(EnvironmentError::AlreadyRunning)` if a process is live.
    async fn execute_async(&self, command: &str, args: &[String]) -> Result<(), EnvironmentError>;

    /// Spawn `command` and block until it finishes.
    async fn execute(&self, command: &str, args: &[String]) -> Result<WaitOutcome, EnvironmentError> {
        self.execute_async(command, args).await?;
        self.wait_for_main_process().await
    }

    /// Write a line of input to the main process.
    async fn execute_in_main_process(&self, input: &str) -> Result<(), EnvironmentError>;

    /// Force-terminate the main process. No-op when nothing is running.
    async fn kill(&self) -> Result<(), EnvironmentError>;

    /// Probe whether the tracked process is alive right now.
    fn is_running(&self) -> bool;

    /// PID of the tracked process, if any.
    fn pid(&self) -> Option<u32>;

    /// Wait for the main process to exit, without a deadline.
    async fn wait_for_main_process(&self) -> Result<WaitOutcome, EnvironmentError> {
        self.wait_for_main_process_for(Duration::ZERO).await
    }

    /// Wait for the main process to exit, killing it if `timeout` elapses first.
    ///
    /// A zero `timeout` waits indefinitely.
    async fn wait_for_main_process_for(
        &self,
        timeout: Duration,
    ) -> Result<WaitOutcome, EnvironmentError>;

    /// Full retained console.
    fn console(&self) -> ConsoleSnapshot;

    /// Console lines written at or after `epoch`.
    fn console_from(&self, epoch: u64) -> ConsoleSnapshot;

    /// Subscribe a live observer to console output.
    fn add_listener(&self, listener: Box<dyn ConsoleListener>) -> ListenerId;

    /// Drop a live observer. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);

    /// Memory and CPU usage of the live process.
    async fn stats(&self) -> Result<ProcessStats, EnvironmentError>;

    /// Append a daemon-authored status line to the console.
    fn display_to_console(&self, line: &str);
}
