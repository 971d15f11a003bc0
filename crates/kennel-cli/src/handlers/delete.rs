//! Delete command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, id: &str) -> Result<(), CliError> {
    ctx.registry().delete(id).await?;
    println!("Deleted {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;

    #[tokio::test]
    async fn test_delete_forgets_program() {
        let (_dir, ctx, _factory, _store) = context(&["alpha"]);

        execute(&ctx, "alpha").await.unwrap();

        assert!(ctx.registry().get("alpha").is_none());
        assert!(matches!(
            execute(&ctx, "alpha").await,
            Err(CliError::NotFound(_))
        ));
    }
}
