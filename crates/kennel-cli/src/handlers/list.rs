//! List command handler.

use serde_json::json;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_separator, truncate_string};

/// Print every registered program with its state, environment kind and
/// network address.
pub fn execute(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let registry = ctx.registry();
    let programs: Vec<_> = registry
        .ids()
        .into_iter()
        .filter_map(|id| registry.get(&id))
        .collect();

    if as_json {
        let rows: Vec<_> = programs
            .iter()
            .map(|p| {
                json!({
                    "id": p.id(),
                    "state": p.state(),
                    "environment": p.environment_kind().to_string(),
                    "network": p.network(),
                    "enabled": p.is_enabled(),
                    "autostart": p.is_autostart(),
                })
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&rows)
            .map_err(|e| CliError::Config(e.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }

    if programs.is_empty() {
        println!("No programs found in {}.", ctx.config.programs_dir.display());
        println!("Use 'kenneld create <id> <definition.json>' to add one.");
        return Ok(());
    }

    println!(
        "{:<24} {:<12} {:<10} {:<22} Flags",
        "ID", "State", "Env", "Network"
    );
    print_separator(80);
    for program in programs {
        let mut flags = Vec::new();
        if !program.is_enabled() {
            flags.push("disabled");
        }
        if program.is_autostart() {
            flags.push("autostart");
        }
        println!(
            "{:<24} {:<12} {:<10} {:<22} {}",
            truncate_string(program.id(), 23),
            program.state().to_string(),
            program.environment_kind().to_string(),
            program.network(),
            flags.join(",")
        );
    }
    Ok(())
}
