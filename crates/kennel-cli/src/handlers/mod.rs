//! Command handlers.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<(), CliError>`
//! - Thin wrappers that:
//!   1. Parse/validate CLI-specific input
//!   2. Call registry or program methods
//!   3. Format output for the terminal

pub mod authorize;
pub mod create;
pub mod delete;
pub mod edit;
pub mod install;
pub mod list;
pub mod run;
pub mod show;
pub mod start;

use kennel_core::Program;
use std::sync::Arc;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Look up a registered program.
pub(crate) fn program(ctx: &CliContext, id: &str) -> Result<Arc<Program>, CliError> {
    ctx.registry()
        .get(id)
        .ok_or_else(|| CliError::NotFound(id.to_string()))
}
