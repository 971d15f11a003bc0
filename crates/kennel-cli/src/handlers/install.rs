//! Install command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::program;
use crate::presentation::print_lines;

/// Re-run the install steps, optionally refreshing the environment first.
/// Console lines produced along the way are printed either way.
pub async fn execute(ctx: &CliContext, id: &str, update: bool) -> Result<(), CliError> {
    let program = program(ctx, id)?;
    let environment = program.environment();
    let epoch = environment.console().epoch;

    let result = if update {
        program.update().await
    } else {
        program.install().await
    };
    print_lines(&environment.console_from(epoch).lines);
    result?;
    Ok(())
}
