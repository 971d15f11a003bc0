use async_trait::async_trait;

use super::Operation;
use crate::install::{OperationError, resolve_in_root};
use crate::ports::Environment;

const DIR_MODE: u32 = 0o755;

/// `mkdir`: create a directory tree under the root.
#[derive(Debug, Clone)]
pub struct MkdirOperation {
    target: String,
}

impl MkdirOperation {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl Operation for MkdirOperation {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    async fn run(&self, environment: &dyn Environment) -> Result<(), OperationError> {
        let path = resolve_in_root(environment.root_directory(), &self.target)?;

        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);

        builder
            .create(&path)
            .await
            .map_err(|e| OperationError::filesystem(&path, &e))
    }
}
