//! Install pipeline.
//!
//! An [`InstallProcess`] is built from a program's install section, its
//! environment and its current data. It hands steps out one at a time so the
//! caller decides how to react to a failure and can observe progress.

pub mod operations;

use std::collections::VecDeque;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::domain::{InstallSection, ProgramData, resolved_values};
use crate::ports::{ArtifactFetcher, Environment, EnvironmentError, FetchError};

pub use operations::{
    CommandOperation, DownloadOperation, MkdirOperation, MoveOperation, Operation,
    WriteFileOperation, build_operation,
};

/// Why a single install step failed.
#[derive(Debug, Error)]
pub enum OperationError {
    /// A file or directory operation failed.
    #[error("Filesystem error at {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },

    /// A path would resolve outside the environment root.
    #[error("Invalid path {0}: must stay inside the server directory")]
    InvalidPath(String),

    /// A command ran but did not succeed.
    #[error("Command `{command}` failed with exit code {}", exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
    },

    /// A download failed.
    #[error(transparent)]
    Download(#[from] FetchError),

    /// The environment refused the step.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

impl OperationError {
    pub(crate) fn filesystem(path: &Path, err: &std::io::Error) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }
}

/// A failed step together with its position in the pipeline.
#[derive(Debug, Error)]
#[error("Install step {step} ({operation}) failed: {source}")]
pub struct StepError {
    /// Zero-based index of the step.
    pub step: usize,
    /// Operation name, e.g. `writefile`.
    pub operation: &'static str,
    #[source]
    pub source: OperationError,
}

/// Ordered, fail-fast sequence of provisioning steps.
pub struct InstallProcess {
    environment: Arc<dyn Environment>,
    steps: VecDeque<Box<dyn Operation>>,
    completed: usize,
}

impl InstallProcess {
    /// Build the pipeline for `section`, substituting `%name%` tokens from `data`
    /// into every step parameter.
    pub fn generate(
        section: &InstallSection,
        environment: Arc<dyn Environment>,
        data: &ProgramData,
        fetcher: Arc<dyn ArtifactFetcher>,
    ) -> Self {
        let values = resolved_values(data);
        let steps = section
            .commands
            .iter()
            .map(|spec| build_operation(spec, &values, Arc::clone(&fetcher)))
            .collect();
        Self::from_operations(environment, steps)
    }

    /// Build a pipeline from already-constructed operations.
    pub fn from_operations(
        environment: Arc<dyn Environment>,
        steps: Vec<Box<dyn Operation>>,
    ) -> Self {
        Self {
            environment,
            steps: steps.into(),
            completed: 0,
        }
    }

    /// Whether any step is left.
    pub fn has_next(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Number of steps not yet run.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Number of steps that ran successfully.
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Run the next step. Does nothing when the pipeline is exhausted.
    pub async fn run_next(&mut self) -> Result<(), StepError> {
        let Some(step) = self.steps.pop_front() else {
            return Ok(());
        };
        let index = self.completed;
        debug!(step = index, operation = step.name(), "running install step");

        step.run(self.environment.as_ref())
            .await
            .map_err(|source| StepError {
                step: index,
                operation: step.name(),
                source,
            })?;
        self.completed += 1;
        Ok(())
    }
}

/// Resolve `relative` against `root`, rejecting anything that could escape it.
pub fn resolve_in_root(root: &Path, relative: &str) -> Result<PathBuf, OperationError> {
    let candidate = Path::new(relative);
    let mut resolved = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(OperationError::InvalidPath(relative.to_string()));
            }
        }
    }
    if resolved == root {
        return Err(OperationError::InvalidPath(relative.to_string()));
    }
    Ok(resolved)
}
