//! Environment backed by a pseudo-terminal.
//!
//! Some workloads only behave when attached to a terminal. The child becomes
//! a session leader with the PTY slave as its controlling terminal; a blocking
//! copy loop streams everything the master side reads into the console.

use async_trait::async_trait;
use kennel_core::{
    ConsoleListener, ConsoleSnapshot, Environment, EnvironmentError, EnvironmentKind, ListenerId,
    ProcessStats, WaitOutcome,
};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::slot::ProcessSlot;
use super::{Console, EnvironmentSettings, OUTPUT_DRAIN_TIMEOUT, create_root, delete_root};
use crate::process;

/// Terminal size every PTY is opened with.
pub const PTY_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 80,
    pixel_width: 0,
    pixel_height: 0,
};

/// Master side of a live PTY. Keeping the master here keeps the terminal
/// open for as long as the process is tracked.
struct PtyInput {
    writer: Mutex<Box<dyn Write + Send>>,
    _master: Mutex<Box<dyn MasterPty + Send>>,
}

/// Runs the workload attached to a pseudo-terminal.
///
/// Input lines are terminated with `\r`; the terminal's line discipline
/// turns that into the newline the workload reads.
pub struct PtyEnvironment {
    root: PathBuf,
    console: Console,
    slot: Arc<ProcessSlot<Arc<PtyInput>>>,
}

impl PtyEnvironment {
    pub fn new(root: impl Into<PathBuf>, settings: EnvironmentSettings) -> Self {
        Self {
            root: root.into(),
            console: Console::new(settings),
            slot: Arc::new(ProcessSlot::new()),
        }
    }
}

fn spawn_failed(command: &str, reason: impl ToString) -> EnvironmentError {
    EnvironmentError::SpawnFailed {
        command: command.to_string(),
        reason: reason.to_string(),
    }
}

/// Kill and reap a child whose terminal could not be wired up.
fn abandon(mut child: Box<dyn Child + Send + Sync>) {
    if let Err(e) = ChildKiller::kill(&mut *child) {
        warn!(error = %e, "Failed to kill abandoned PTY process");
    }
    tokio::task::spawn_blocking(move || {
        let _ = child.wait();
    });
}

#[async_trait]
impl Environment for PtyEnvironment {
    fn kind(&self) -> EnvironmentKind {
        EnvironmentKind::Tty
    }

    fn root_directory(&self) -> &Path {
        &self.root
    }

    async fn create(&self) -> Result<(), EnvironmentError> {
        create_root(&self.root).await
    }

    async fn delete(&self) -> Result<(), EnvironmentError> {
        delete_root(&self.root).await
    }

    async fn execute_async(&self, command: &str, args: &[String]) -> Result<(), EnvironmentError> {
        if let Some(pid) = self.slot.live_pid() {
            return Err(EnvironmentError::AlreadyRunning { pid });
        }

        let pair = native_pty_system()
            .openpty(PTY_SIZE)
            .map_err(|e| spawn_failed(command, e))?;

        let mut builder = CommandBuilder::new(command);
        builder.args(args);
        builder.cwd(&self.root);
        builder.env("HOME", &self.root);

        let mut child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| spawn_failed(command, e))?;
        // Only the child may hold the slave, or the master never sees EOF.
        drop(pair.slave);

        let streams = child
            .process_id()
            .ok_or_else(|| spawn_failed(command, "process has no PID"))
            .and_then(|pid| {
                let reader = pair
                    .master
                    .try_clone_reader()
                    .map_err(|e| spawn_failed(command, e))?;
                let writer = pair
                    .master
                    .take_writer()
                    .map_err(|e| spawn_failed(command, e))?;
                Ok((pid, reader, writer))
            });
        let (pid, reader, writer) = match streams {
            Ok(streams) => streams,
            Err(e) => {
                abandon(child);
                return Err(e);
            }
        };

        let output = self.console.writer();
        let copy_loop = tokio::task::spawn_blocking(move || output.copy_blocking(reader));

        let input = Arc::new(PtyInput {
            writer: Mutex::new(writer),
            _master: Mutex::new(pair.master),
        });
        let (generation, signal) = self.slot.begin(pid, input);
        info!(pid, %command, root = %self.root.display(), "PTY process started");

        let slot = Arc::clone(&self.slot);
        tokio::spawn(async move {
            let exit_code = match tokio::task::spawn_blocking(move || child.wait()).await {
                Ok(Ok(status)) => i32::try_from(status.exit_code()).ok(),
                Ok(Err(e)) => {
                    warn!(pid, error = %e, "Failed to wait on PTY process");
                    None
                }
                Err(e) => {
                    warn!(pid, error = %e, "PTY wait task failed");
                    None
                }
            };
            slot.release(generation);
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, copy_loop)
                .await
                .is_err()
            {
                debug!(pid, "PTY output still open after exit");
            }
            slot.finish(generation, &signal, exit_code);
        });

        Ok(())
    }

    async fn execute_in_main_process(&self, input: &str) -> Result<(), EnvironmentError> {
        let pty = self.slot.input()?;
        let line = format!("{input}\r");
        tokio::task::spawn_blocking(move || {
            let mut writer = pty.writer.lock().unwrap_or_else(PoisonError::into_inner);
            writer.write_all(line.as_bytes())?;
            writer.flush()
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(())
    }

    async fn kill(&self) -> Result<(), EnvironmentError> {
        self.slot.kill()
    }

    fn is_running(&self) -> bool {
        self.slot.live_pid().is_some()
    }

    fn pid(&self) -> Option<u32> {
        self.slot.tracked_pid()
    }

    async fn wait_for_main_process_for(
        &self,
        timeout: Duration,
    ) -> Result<WaitOutcome, EnvironmentError> {
        self.slot.wait(timeout).await
    }

    fn console(&self) -> ConsoleSnapshot {
        self.console.read()
    }

    fn console_from(&self, epoch: u64) -> ConsoleSnapshot {
        self.console.read_from(epoch)
    }

    fn add_listener(&self, listener: Box<dyn ConsoleListener>) -> ListenerId {
        self.console.add_listener(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.console.remove_listener(id);
    }

    async fn stats(&self) -> Result<ProcessStats, EnvironmentError> {
        let pid = self.slot.live_pid().ok_or(EnvironmentError::NotRunning)?;
        process::sample(pid).await
    }

    fn display_to_console(&self, line: &str) {
        self.console.display(line);
    }
}
