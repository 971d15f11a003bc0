use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::Operation;
use crate::install::{OperationError, resolve_in_root};
use crate::ports::Environment;

const FILE_MODE: u32 = 0o644;

/// `writefile`: create or overwrite a file under the root with literal text.
#[derive(Debug, Clone)]
pub struct WriteFileOperation {
    target: String,
    text: String,
}

impl WriteFileOperation {
    pub fn new(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl Operation for WriteFileOperation {
    fn name(&self) -> &'static str {
        "writefile"
    }

    async fn run(&self, environment: &dyn Environment) -> Result<(), OperationError> {
        let path = resolve_in_root(environment.root_directory(), &self.target)?;
        environment.display_to_console(&format!("Writing file {}", self.target));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OperationError::filesystem(parent, &e))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true).write(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let mut file = options
            .open(&path)
            .await
            .map_err(|e| OperationError::filesystem(&path, &e))?;
        file.write_all(self.text.as_bytes())
            .await
            .map_err(|e| OperationError::filesystem(&path, &e))?;
        file.flush()
            .await
            .map_err(|e| OperationError::filesystem(&path, &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(FILE_MODE))
                .await
                .map_err(|e| OperationError::filesystem(&path, &e))?;
        }
        Ok(())
    }
}
