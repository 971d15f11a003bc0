//! Install step implementations.
//!
//! Each [`OperationSpec`] variant maps to one [`Operation`]. Token
//! substitution happens once, when the operation is built, so running a step
//! never looks at program data again.

mod command;
mod download;
mod mkdir;
mod move_path;
mod write_file;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::OperationError;
use crate::domain::{OperationSpec, replace_tokens, replace_tokens_in_all};
use crate::ports::{ArtifactFetcher, Environment};

pub use command::CommandOperation;
pub(crate) use command::run_command_line;
pub use download::DownloadOperation;
pub use mkdir::MkdirOperation;
pub use move_path::MoveOperation;
pub use write_file::WriteFileOperation;

/// One provisioning step executed against an environment.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Short name used in logs and step failures.
    fn name(&self) -> &'static str;

    /// Execute the step.
    async fn run(&self, environment: &dyn Environment) -> Result<(), OperationError>;
}

/// Build the operation for `spec`, with `%name%` tokens already filled in.
pub fn build_operation(
    spec: &OperationSpec,
    values: &BTreeMap<String, String>,
    fetcher: Arc<dyn ArtifactFetcher>,
) -> Box<dyn Operation> {
    let fill = |s: &String| replace_tokens(s, values);
    match spec {
        OperationSpec::WriteFile { target, text } => {
            Box::new(WriteFileOperation::new(fill(target), fill(text)))
        }
        OperationSpec::Mkdir { target } => Box::new(MkdirOperation::new(fill(target))),
        OperationSpec::Move { source, target } => {
            Box::new(MoveOperation::new(fill(source), fill(target)))
        }
        OperationSpec::Command { commands } => {
            Box::new(CommandOperation::new(replace_tokens_in_all(commands, values)))
        }
        OperationSpec::Download { files } => Box::new(DownloadOperation::new(
            replace_tokens_in_all(files, values),
            fetcher,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FetchError;
    use std::path::Path;

    struct NoFetch;

    #[async_trait]
    impl ArtifactFetcher for NoFetch {
        async fn fetch(&self, url: &str, _destination: &Path) -> Result<u64, FetchError> {
            Err(FetchError::Request {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    #[test]
    fn test_build_operation_names() {
        let values = BTreeMap::from([("name".to_string(), "alpha".to_string())]);
        let fetcher: Arc<dyn ArtifactFetcher> = Arc::new(NoFetch);
        let specs = [
            OperationSpec::WriteFile {
                target: "%name%.txt".to_string(),
                text: "x".to_string(),
            },
            OperationSpec::Mkdir {
                target: "world".to_string(),
            },
            OperationSpec::Move {
                source: "a".to_string(),
                target: "b".to_string(),
            },
            OperationSpec::Command {
                commands: vec!["true".to_string()],
            },
            OperationSpec::Download { files: vec![] },
        ];
        let names: Vec<_> = specs
            .iter()
            .map(|s| build_operation(s, &values, Arc::clone(&fetcher)).name())
            .collect();
        assert_eq!(names, ["writefile", "mkdir", "move", "command", "download"]);
    }
}
