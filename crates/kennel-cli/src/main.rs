//! kenneld entry point - the composition root.
//!
//! Infrastructure is wired together in `bootstrap`; command dispatch routes
//! to handlers.

use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use kennel_cli::handlers::run::RunArgs;
use kennel_cli::{Cli, CliError, Commands, bootstrap, handlers};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(&cli)?;

    match command {
        Commands::List { json } => handlers::list::execute(&ctx, *json)?,
        Commands::Show { id } => handlers::show::execute(&ctx, id)?,
        Commands::Create { id, definition } => {
            handlers::create::execute(&ctx, id, definition).await?;
        }
        Commands::Install { id, update } => handlers::install::execute(&ctx, id, *update).await?,
        Commands::Start { id } => handlers::start::execute(&ctx, id).await?,
        Commands::Edit { id, assignments } => handlers::edit::execute(&ctx, id, assignments)?,
        Commands::Delete { id } => handlers::delete::execute(&ctx, id).await?,
        Commands::Authorize { id, token, scopes } => {
            handlers::authorize::execute(&ctx, id, token, scopes).await?;
        }
        Commands::Run {
            no_autostart,
            stats_interval,
        } => {
            let args = RunArgs {
                autostart: !no_autostart,
                stats_interval: Duration::from_secs(*stats_interval),
            };
            handlers::run::execute(&ctx, args).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
