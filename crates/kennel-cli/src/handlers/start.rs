//! Start command handler: run one program in the foreground.

use kennel_core::{ProgramError, STOP_GRACE_PERIOD, WaitOutcome};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::program;
use crate::presentation::{CONSOLE_QUEUE, print_chunks};

/// Start `id`, stream its console to stdout and wait for it to exit.
///
/// Ctrl+C sends the program's stop command and waits up to the stop grace
/// period before the process is killed.
pub async fn execute(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let program = program(ctx, id)?;
    let environment = program.environment();

    let (tx, rx) = mpsc::channel::<Vec<u8>>(CONSOLE_QUEUE);
    let listener = environment.add_listener(Box::new(tx));
    let printer = tokio::spawn(print_chunks(rx));

    let outcome = async {
        program.start().await?;
        tokio::select! {
            outcome = environment.wait_for_main_process() => Ok::<_, ProgramError>(outcome?),
            _ = tokio::signal::ctrl_c() => {
                info!(program_id = %id, "Interrupted, stopping program");
                if let Err(e) = program.stop().await {
                    warn!(program_id = %id, error = %e, "Stop command failed");
                }
                Ok(environment.wait_for_main_process_for(STOP_GRACE_PERIOD).await?)
            }
        }
    }
    .await;

    // Dropping the listener closes the channel, which ends the printer.
    environment.remove_listener(listener);
    let _ = printer.await;

    match outcome? {
        WaitOutcome::Completed { exit_code: Some(0) } => Ok(()),
        WaitOutcome::Completed { exit_code: Some(code) } => Err(CliError::Process(format!(
            "{id} exited with code {code}"
        ))),
        WaitOutcome::Completed { exit_code: None } => {
            Err(CliError::Process(format!("{id} was terminated by a signal")))
        }
        WaitOutcome::TimedOut => Err(CliError::Process(format!(
            "{id} did not stop within {}s and was killed",
            STOP_GRACE_PERIOD.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;

    #[tokio::test]
    async fn test_start_reports_exit_code() {
        let (dir, ctx, factory, _store) = context(&["alpha"]);
        let env = factory
            .environment_at(&dir.path().join("servers/alpha"))
            .unwrap();

        execute(&ctx, "alpha").await.unwrap();
        assert_eq!(env.executed()[0].0, "server");

        env.set_exit_code(3);
        let err = execute(&ctx, "alpha").await.unwrap_err();
        assert!(err.to_string().contains("exited with code 3"));
    }

    #[tokio::test]
    async fn test_start_surfaces_spawn_failures() {
        let (dir, ctx, factory, _store) = context(&["alpha"]);
        factory
            .environment_at(&dir.path().join("servers/alpha"))
            .unwrap()
            .fail_spawns(true);

        assert!(matches!(
            execute(&ctx, "alpha").await,
            Err(CliError::Process(_))
        ));
    }
}
