//! Program service - orchestrates one workload's lifecycle.
//!
//! A [`Program`] binds a persisted [`ProgramDefinition`] to an
//! [`Environment`]. Every lifecycle call mirrors a short status line to the
//! environment's console so remote observers see what the daemon is doing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{
    ParamValue, ParameterDescriptor, ParameterError, ProgramData, ProgramDefinition,
    replace_tokens_in_all,
};
use crate::install::{InstallProcess, OperationError, StepError};
use crate::install::operations::run_command_line;
use crate::ports::{
    Environment, EnvironmentError, EnvironmentKind, ProcessStats, ProgramPorts, StoreError,
};

/// How long `install` waits for a stopped workload to exit before killing it.
pub const STOP_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// How long `destroy` waits for a killed workload to be reaped.
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from program lifecycle operations.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// An install step failed; later steps did not run.
    #[error("Install step {step} ({operation}) failed: {source}")]
    InstallStepFailure {
        step: usize,
        operation: &'static str,
        #[source]
        source: OperationError,
    },

    /// A `pre` or `post` hook command failed.
    #[error("{stage} hook failed: {source}")]
    HookFailed {
        stage: &'static str,
        #[source]
        source: OperationError,
    },

    #[error(transparent)]
    Validation(#[from] ParameterError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to write definition: {0}")]
    Io(#[from] std::io::Error),

    /// The program was destroyed and accepts no further operations.
    #[error("Program {0} has been destroyed")]
    Destroyed(String),
}

impl From<StepError> for ProgramError {
    fn from(err: StepError) -> Self {
        Self::InstallStepFailure {
            step: err.step,
            operation: err.operation,
            source: err.source,
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramState {
    /// Root directory does not exist.
    Uninstalled,
    /// Installed, no live process.
    Stopped,
    Running,
    /// Terminal.
    Destroyed,
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninstalled => "uninstalled",
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Parameter edits: `None` or an empty text value removes the parameter.
pub type DataOverrides = BTreeMap<String, Option<ParamValue>>;

/// A managed workload.
pub struct Program {
    id: String,
    definition: RwLock<ProgramDefinition>,
    environment: RwLock<Arc<dyn Environment>>,
    ports: ProgramPorts,
    destroyed: AtomicBool,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("id", &self.id)
            .field("destroyed", &self.destroyed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Program {
    /// Bind `definition` to `environment`.
    pub fn new(
        id: impl Into<String>,
        definition: ProgramDefinition,
        environment: Arc<dyn Environment>,
        ports: ProgramPorts,
    ) -> Self {
        Self {
            id: id.into(),
            definition: RwLock::new(definition),
            environment: RwLock::new(environment),
            ports,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn read(&self) -> RwLockReadGuard<'_, ProgramDefinition> {
        self.definition
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProgramDefinition> {
        self.definition
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_alive(&self) -> Result<(), ProgramError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(ProgramError::Destroyed(self.id.clone()));
        }
        Ok(())
    }

    /// The environment this program currently runs in.
    pub fn environment(&self) -> Arc<dyn Environment> {
        Arc::clone(
            &self
                .environment
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Swap the environment. The old one is not stopped.
    pub fn set_environment(&self, environment: Arc<dyn Environment>) {
        *self
            .environment
            .write()
            .unwrap_or_else(PoisonError::into_inner) = environment;
    }

    /// Snapshot of the full definition.
    pub fn definition(&self) -> ProgramDefinition {
        self.read().clone()
    }

    /// Snapshot of the parameters.
    pub fn data(&self) -> ProgramData {
        self.read().data.clone()
    }

    /// Environment variant the definition asks for.
    pub fn environment_kind(&self) -> EnvironmentKind {
        self.read().environment_kind()
    }

    pub fn is_enabled(&self) -> bool {
        self.read().run.enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.write().run.enabled = enabled;
    }

    pub fn is_autostart(&self) -> bool {
        self.read().run.autostart
    }

    pub fn set_autostart(&self, autostart: bool) {
        self.write().run.autostart = autostart;
    }

    pub fn is_running(&self) -> bool {
        self.environment().is_running()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProgramState {
        if self.destroyed.load(Ordering::SeqCst) {
            return ProgramState::Destroyed;
        }
        let environment = self.environment();
        if environment.is_running() {
            ProgramState::Running
        } else if environment.root_directory().is_dir() {
            ProgramState::Stopped
        } else {
            ProgramState::Uninstalled
        }
    }

    /// `"<ip>:<port>"` from the `ip` and `port` parameters.
    pub fn network(&self) -> String {
        let definition = self.read();
        let ip = definition
            .data
            .get("ip")
            .map_or_else(|| "0.0.0.0".to_string(), ParameterDescriptor::render);
        let port = definition
            .data
            .get("port")
            .map_or_else(|| "0".to_string(), ParameterDescriptor::render);
        format!("{ip}:{port}")
    }

    /// Launch the workload with its argument template filled in.
    pub async fn start(&self) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        let environment = self.environment();
        let (program, arguments) = {
            let definition = self.read();
            let values = definition.resolved_values();
            (
                definition.run.program.clone(),
                replace_tokens_in_all(&definition.run.arguments, &values),
            )
        };

        debug!(program_id = %self.id, %program, ?arguments, "Starting program");
        environment.display_to_console("Starting server");
        if let Err(e) = environment.execute_async(&program, &arguments).await {
            error!(program_id = %self.id, error = %e, "Failed to start program");
            environment.display_to_console("Failed to start server");
            return Err(e.into());
        }
        info!(program_id = %self.id, pid = ?environment.pid(), "Program started");
        Ok(())
    }

    /// Ask the workload to shut down by sending its stop command.
    pub async fn stop(&self) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        let environment = self.environment();
        let stop = self.read().run.stop.clone();

        match environment.execute_in_main_process(&stop).await {
            Ok(()) => {
                environment.display_to_console("Server stopped");
                Ok(())
            }
            Err(e) => {
                warn!(program_id = %self.id, error = %e, "Failed to stop program");
                environment.display_to_console("Failed to stop server");
                Err(e.into())
            }
        }
    }

    /// Force-terminate the workload.
    pub async fn kill(&self) -> Result<(), ProgramError> {
        let environment = self.environment();
        match environment.kill().await {
            Ok(()) => {
                environment.display_to_console("Server killed");
                Ok(())
            }
            Err(e) => {
                error!(program_id = %self.id, error = %e, "Failed to kill program");
                environment.display_to_console("Failed to kill server");
                Err(e.into())
            }
        }
    }

    /// Send arbitrary console input to the workload.
    pub async fn execute(&self, command: &str) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        self.environment()
            .execute_in_main_process(command)
            .await
            .map_err(ProgramError::from)
    }

    /// Allocate the environment's resources.
    pub async fn create(&self) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        let environment = self.environment();
        environment.display_to_console("Allocating server");
        environment.create().await?;
        environment.display_to_console("Server allocated");
        Ok(())
    }

    /// Provision the program's files: stop if running, run `pre` hooks, the
    /// install steps in order, then `post` hooks.
    pub async fn install(&self) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        let environment = self.environment();

        if environment.is_running() {
            if let Err(e) = self.stop().await {
                error!(program_id = %self.id, error = %e, "Error stopping program to install");
                environment.display_to_console("Error stopping server");
                return Err(e);
            }
            let outcome = environment
                .wait_for_main_process_for(STOP_GRACE_PERIOD)
                .await?;
            debug!(program_id = %self.id, ?outcome, "Program exited for install");
        }

        environment.display_to_console("Installing server");
        environment.create().await?;

        let (install, pre, post, data) = {
            let definition = self.read();
            let values = definition.resolved_values();
            (
                definition.install.clone(),
                replace_tokens_in_all(&definition.run.pre, &values),
                replace_tokens_in_all(&definition.run.post, &values),
                definition.data.clone(),
            )
        };

        self.run_hooks("pre", &pre, environment.as_ref()).await?;

        let mut process = InstallProcess::generate(
            &install,
            Arc::clone(&environment),
            &data,
            Arc::clone(&self.ports.fetcher),
        );
        while process.has_next() {
            if let Err(e) = process.run_next().await {
                error!(program_id = %self.id, error = %e, "Error running installer");
                environment.display_to_console("Error installing server");
                return Err(e.into());
            }
        }

        self.run_hooks("post", &post, environment.as_ref()).await?;

        info!(program_id = %self.id, steps = process.completed(), "Program installed");
        environment.display_to_console("Server installed");
        Ok(())
    }

    async fn run_hooks(
        &self,
        stage: &'static str,
        commands: &[String],
        environment: &dyn Environment,
    ) -> Result<(), ProgramError> {
        for line in commands {
            if let Err(source) = run_command_line(environment, line).await {
                error!(program_id = %self.id, stage, error = %source, "Install hook failed");
                environment.display_to_console("Error installing server");
                return Err(ProgramError::HookFailed { stage, source });
            }
        }
        Ok(())
    }

    /// Reinstall with the current data.
    pub async fn update(&self) -> Result<(), ProgramError> {
        self.environment().update().await?;
        self.install().await
    }

    /// Kill any live process and remove the environment's files.
    pub async fn destroy(&self) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        let environment = self.environment();
        if environment.is_running() {
            environment.kill().await?;
            environment.wait_for_main_process_for(KILL_REAP_TIMEOUT).await?;
        }
        environment.delete().await?;
        self.destroyed.store(true, Ordering::SeqCst);
        info!(program_id = %self.id, "Program destroyed");
        Ok(())
    }

    /// Apply parameter edits and persist the result.
    ///
    /// All edits are validated before any is applied.
    pub fn edit(&self, overrides: DataOverrides) -> Result<(), ProgramError> {
        self.ensure_alive()?;
        {
            let mut definition = self.write();
            let mut data = definition.data.clone();
            for (name, value) in overrides {
                match value {
                    None => {
                        data.remove(&name);
                    }
                    Some(v) if v.is_empty() => {
                        data.remove(&name);
                    }
                    Some(v) => match data.get_mut(&name) {
                        Some(descriptor) => descriptor.value = descriptor.coerce(&name, v)?,
                        None => {
                            data.insert(name, ParameterDescriptor::new(v));
                        }
                    },
                }
            }
            definition.data = data;
        }
        self.persist()
    }

    /// Replace data, install steps and run settings in one step.
    pub fn reload(&self, replacement: ProgramDefinition) {
        *self.write() = replacement;
        debug!(program_id = %self.id, "Program definition reloaded");
    }

    /// Write the definition document to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ProgramError> {
        self.read().save(path)?;
        Ok(())
    }

    /// Persist the definition through the program store.
    pub fn persist(&self) -> Result<(), ProgramError> {
        let definition = self.definition();
        self.ports.store.save(&self.id, &definition)?;
        Ok(())
    }

    /// Memory and CPU usage of the live workload.
    pub async fn stats(&self) -> Result<ProcessStats, ProgramError> {
        Ok(self.environment().stats().await?)
    }
}
