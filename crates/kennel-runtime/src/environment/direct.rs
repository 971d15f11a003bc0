//! Environment backed by a plain spawn with piped stdio.

use async_trait::async_trait;
use futures_util::future::join_all;
use kennel_core::{
    ConsoleListener, ConsoleSnapshot, Environment, EnvironmentError, EnvironmentKind, ListenerId,
    ProcessStats, WaitOutcome,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::slot::ProcessSlot;
use super::{Console, EnvironmentSettings, OUTPUT_DRAIN_TIMEOUT, create_root, delete_root};
use crate::process;

type Stdin = Arc<AsyncMutex<ChildStdin>>;

/// Runs the workload as a direct child with stdin, stdout and stderr piped.
///
/// Both output streams are merged into the console. Input lines are
/// terminated with `\n`.
pub struct DirectEnvironment {
    root: PathBuf,
    console: Console,
    slot: Arc<ProcessSlot<Stdin>>,
}

impl DirectEnvironment {
    pub fn new(root: impl Into<PathBuf>, settings: EnvironmentSettings) -> Self {
        Self {
            root: root.into(),
            console: Console::new(settings),
            slot: Arc::new(ProcessSlot::new()),
        }
    }
}

#[async_trait]
impl Environment for DirectEnvironment {
    fn kind(&self) -> EnvironmentKind {
        EnvironmentKind::Standard
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

        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(&self.root)
            .env("HOME", &self.root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a kill also reaches the workload's children.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| EnvironmentError::SpawnFailed {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let Some(pid) = child.id() else {
            return Err(EnvironmentError::SpawnFailed {
                command: command.to_string(),
                reason: "process exited before its PID could be read".to_string(),
            });
        };
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(EnvironmentError::SpawnFailed {
                command: command.to_string(),
                reason: "stdio pipes were not created".to_string(),
            });
        };

        let writer = self.console.writer();
        let readers = vec![
            writer.spawn_reader(stdout, "stdout"),
            writer.spawn_reader(stderr, "stderr"),
        ];

        let (generation, signal) = self.slot.begin(pid, Arc::new(AsyncMutex::new(stdin)));
        info!(pid, %command, root = %self.root.display(), "Process started");

        let slot = Arc::clone(&self.slot);
        tokio::spawn(async move {
            let exit_code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(pid, error = %e, "Failed to wait on process");
                    None
                }
            };
            slot.release(generation);
            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, join_all(readers))
                .await
                .is_err()
            {
                debug!(pid, "Output readers still open after exit");
            }
            slot.finish(generation, &signal, exit_code);
        });

        Ok(())
    }

    async fn execute_in_main_process(&self, input: &str) -> Result<(), EnvironmentError> {
        let stdin = self.slot.input()?;
        let mut stdin = stdin.lock().await;
        stdin.write_all(format!("{input}\n").as_bytes()).await?;
        stdin.flush().await?;
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
