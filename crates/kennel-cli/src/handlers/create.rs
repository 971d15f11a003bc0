//! Create command handler.

use kennel_core::ProgramDefinition;
use std::path::Path;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_lines;

/// Register `id` from the document at `definition`, then allocate and
/// install it.
pub async fn execute(ctx: &CliContext, id: &str, definition: &Path) -> Result<(), CliError> {
    let json = std::fs::read_to_string(definition)
        .map_err(|e| CliError::Io(format!("{}: {e}", definition.display())))?;
    let definition = ProgramDefinition::from_json(&json)
        .map_err(|e| CliError::Config(format!("{}: {e}", definition.display())))?;

    let result = ctx.registry().create(id, definition).await;
    if let Some(program) = ctx.registry().get(id) {
        print_lines(&program.environment().console().lines);
    }
    let program = result?;

    println!("Created {} ({})", program.id(), program.state());
    Ok(())
}
