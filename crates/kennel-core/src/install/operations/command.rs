use async_trait::async_trait;
use tracing::debug;

use super::Operation;
use crate::install::OperationError;
use crate::ports::{Environment, WaitOutcome};

/// `command`: run command lines in the environment, one after another.
///
/// Each line is split on whitespace; the first word is the program. A line
/// that exits non-zero, or is killed, fails the step.
#[derive(Debug, Clone)]
pub struct CommandOperation {
    commands: Vec<String>,
}

impl CommandOperation {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }
}

/// Run one whitespace-separated command line and require a zero exit.
pub(crate) async fn run_command_line(
    environment: &dyn Environment,
    line: &str,
) -> Result<(), OperationError> {
    let mut words = line.split_whitespace();
    let Some(program) = words.next() else {
        return Ok(());
    };
    let args: Vec<String> = words.map(str::to_string).collect();
    debug!(command = %line, "running command");

    match environment.execute(program, &args).await? {
        WaitOutcome::Completed { exit_code: Some(0) } => Ok(()),
        WaitOutcome::Completed { exit_code } => Err(OperationError::CommandFailed {
            command: line.to_string(),
            exit_code,
        }),
        WaitOutcome::TimedOut => Err(OperationError::CommandFailed {
            command: line.to_string(),
            exit_code: None,
        }),
    }
}

#[async_trait]
impl Operation for CommandOperation {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn run(&self, environment: &dyn Environment) -> Result<(), OperationError> {
        for line in &self.commands {
            run_command_line(environment, line).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEnvironment;

    #[tokio::test]
    async fn test_runs_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let env = FakeEnvironment::new(dir.path());

        CommandOperation::new(vec!["chmod +x run.sh".to_string(), "  ".to_string(), "./run.sh --init".to_string()])
            .run(&env)
            .await
            .unwrap();

        assert_eq!(
            env.executed(),
            vec![
                ("chmod".to_string(), vec!["+x".to_string(), "run.sh".to_string()]),
                ("./run.sh".to_string(), vec!["--init".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let env = FakeEnvironment::new(dir.path());
        env.set_exit_code(2);

        let err = CommandOperation::new(vec!["false".to_string(), "true".to_string()])
            .run(&env)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OperationError::CommandFailed { exit_code: Some(2), .. }
        ));
        assert_eq!(env.executed().len(), 1);
    }
}
