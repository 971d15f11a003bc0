//! Authorize command handler.

use kennel_core::ports::authorize;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Introspect `token` and check it grants `scopes` on program `id`.
pub async fn execute(
    ctx: &CliContext,
    id: &str,
    token: &str,
    scopes: &[String],
) -> Result<(), CliError> {
    let introspector = ctx.introspector.as_ref().ok_or_else(|| {
        CliError::Config("token introspection needs infoserver and authtoken".to_string())
    })?;

    let info = introspector.introspect(token).await?;
    let required: Vec<&str> = scopes.iter().map(String::as_str).collect();
    authorize(&info, id, &required)?;

    println!("Token is valid for {id}");
    if !info.scopes.is_empty() {
        println!("Scopes: {}", info.scopes.join(" "));
    }
    Ok(())
}
