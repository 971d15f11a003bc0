//! Concrete [`Environment`] implementations.
//!
//! Two variants share nothing but the console plumbing and the directory
//! handling in this module: [`DirectEnvironment`] spawns with piped stdio,
//! [`PtyEnvironment`] spawns attached to a pseudo-terminal.

mod direct;
mod pty;
mod slot;

use kennel_core::ports::keys;
use kennel_core::{
    ConfigProvider, ConsoleListener, ConsoleSnapshot, Environment, EnvironmentError,
    EnvironmentFactory, EnvironmentKind, ListenerId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::console::{BroadcastHub, ConsoleBuffer, DEFAULT_CAPACITY, OutputWriter};

pub use direct::DirectEnvironment;
pub use pty::PtyEnvironment;

/// Mode for environment root directories.
pub const ROOT_DIR_MODE: u32 = 0o755;

/// How long a reaper waits for output readers to drain after the process
/// exits.
pub(crate) const OUTPUT_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Per-environment tunables read from daemon configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentSettings {
    /// Lines kept in each console buffer.
    pub console_capacity: usize,
    /// Echo workload output to the daemon's stdout.
    pub forward: bool,
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            console_capacity: DEFAULT_CAPACITY,
            forward: false,
        }
    }
}

impl EnvironmentSettings {
    /// Read `consolebuffer` and `forward`. Unparseable values fall back to
    /// the defaults.
    pub fn from_config(config: &dyn ConfigProvider) -> Self {
        let console_capacity = match config.get(keys::CONSOLE_BUFFER) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Invalid consolebuffer setting, using default");
                DEFAULT_CAPACITY
            }),
            None => DEFAULT_CAPACITY,
        };
        Self {
            console_capacity,
            forward: config.flag(keys::FORWARD),
        }
    }
}

/// Console state owned by one environment.
pub(crate) struct Console {
    buffer: Arc<ConsoleBuffer>,
    hub: Arc<BroadcastHub>,
    writer: Arc<OutputWriter>,
}

impl Console {
    pub(crate) fn new(settings: EnvironmentSettings) -> Self {
        let buffer = Arc::new(ConsoleBuffer::new(settings.console_capacity));
        let hub = Arc::new(BroadcastHub::new());
        let writer = Arc::new(OutputWriter::for_console(
            Arc::clone(&buffer),
            Arc::clone(&hub),
            settings.forward,
        ));
        Self {
            buffer,
            hub,
            writer,
        }
    }

    /// Writer process output should be routed through.
    pub(crate) fn writer(&self) -> Arc<OutputWriter> {
        Arc::clone(&self.writer)
    }

    pub(crate) fn read(&self) -> ConsoleSnapshot {
        self.buffer.read()
    }

    pub(crate) fn read_from(&self, epoch: u64) -> ConsoleSnapshot {
        self.buffer.read_from(epoch)
    }

    pub(crate) fn add_listener(&self, listener: Box<dyn ConsoleListener>) -> ListenerId {
        self.hub.register(listener)
    }

    pub(crate) fn remove_listener(&self, id: ListenerId) {
        self.hub.unregister(id);
    }

    /// Daemon status lines go to history and live listeners, never stdout.
    pub(crate) fn display(&self, line: &str) {
        self.buffer.push_line(line);
        self.hub.write(format!("{line}\n").as_bytes());
    }
}

/// Create `root` (and missing parents). An existing directory is fine.
pub(crate) async fn create_root(root: &Path) -> Result<(), EnvironmentError> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(ROOT_DIR_MODE);

    builder
        .create(root)
        .await
        .map_err(|e| EnvironmentError::Filesystem {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
    debug!(root = %root.display(), "Environment root created");
    Ok(())
}

/// Recursively remove `root`. A missing directory is fine.
pub(crate) async fn delete_root(root: &Path) -> Result<(), EnvironmentError> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => {
            debug!(root = %root.display(), "Environment root removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EnvironmentError::Filesystem {
            path: root.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Builds the environment variant a program asks for.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeEnvironmentFactory {
    settings: EnvironmentSettings,
}

impl RuntimeEnvironmentFactory {
    pub const fn new(settings: EnvironmentSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &dyn ConfigProvider) -> Self {
        Self::new(EnvironmentSettings::from_config(config))
    }
}

impl EnvironmentFactory for RuntimeEnvironmentFactory {
    fn build(&self, kind: EnvironmentKind, root: PathBuf) -> Arc<dyn Environment> {
        match kind {
            EnvironmentKind::Standard => Arc::new(DirectEnvironment::new(root, self.settings)),
            EnvironmentKind::Tty => Arc::new(PtyEnvironment::new(root, self.settings)),
        }
    }
}
