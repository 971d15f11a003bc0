use async_trait::async_trait;

use super::Operation;
use crate::install::{OperationError, resolve_in_root};
use crate::ports::Environment;

/// `move`: rename a file or directory within the root.
#[derive(Debug, Clone)]
pub struct MoveOperation {
    source: String,
    target: String,
}

impl MoveOperation {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[async_trait]
impl Operation for MoveOperation {
    fn name(&self) -> &'static str {
        "move"
    }

    async fn run(&self, environment: &dyn Environment) -> Result<(), OperationError> {
        let root = environment.root_directory();
        let from = resolve_in_root(root, &self.source)?;
        let to = resolve_in_root(root, &self.target)?;

        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OperationError::filesystem(parent, &e))?;
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| OperationError::filesystem(&from, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEnvironment;

    #[tokio::test]
    async fn test_renames_within_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server-1.2.jar"), b"jar").unwrap();
        let env = FakeEnvironment::new(dir.path());

        MoveOperation::new("server-1.2.jar", "bin/server.jar")
            .run(&env)
            .await
            .unwrap();

        assert!(!dir.path().join("server-1.2.jar").exists());
        assert_eq!(std::fs::read(dir.path().join("bin/server.jar")).unwrap(), b"jar");
    }

    #[tokio::test]
    async fn test_missing_source_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let env = FakeEnvironment::new(dir.path());

        let err = MoveOperation::new("nope", "dest").run(&env).await.unwrap_err();
        assert!(matches!(err, OperationError::Filesystem { .. }));
    }
}
