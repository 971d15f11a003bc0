//! Show command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::handlers::program;

pub fn execute(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    let program = program(ctx, id)?;
    let document = program
        .definition()
        .to_json_pretty()
        .map_err(|e| CliError::Config(e.to_string()))?;

    println!("Program:     {}", program.id());
    println!("State:       {}", program.state());
    println!("Environment: {}", program.environment_kind());
    println!("Root:        {}", program.environment().root_directory().display());
    println!("Network:     {}", program.network());
    println!();
    println!("{document}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;

    #[test]
    fn test_show_unknown_program() {
        let (_dir, ctx, _factory, _store) = context(&["alpha"]);
        execute(&ctx, "alpha").unwrap();
        assert!(matches!(execute(&ctx, "beta"), Err(CliError::NotFound(_))));
    }
}
