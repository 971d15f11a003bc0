//! Run command handler: the long-running daemon.

use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_bytes;

/// Options for [`execute`].
#[derive(Debug, Clone, Copy)]
pub struct RunArgs {
    pub autostart: bool,
    /// Zero disables periodic stats logging.
    pub stats_interval: Duration,
}

/// Start autostart programs, log resource usage periodically and kill every
/// running program on Ctrl+C.
pub async fn execute(ctx: &CliContext, args: RunArgs) -> Result<(), CliError> {
    let registry = ctx.registry();
    info!(
        programs = registry.ids().len(),
        servers_dir = %ctx.config.servers_dir.display(),
        "kenneld running"
    );

    if args.autostart {
        let started = registry.autostart().await;
        info!(started, "Autostart complete");
    }

    let mut ticker = (!args.stats_interval.is_zero()).then(|| {
        let mut interval = tokio::time::interval(args.stats_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C, shutting down");
                }
                break;
            }
            () = tick(&mut ticker) => log_stats(ctx).await,
        }
    }

    info!("Shutting down");
    registry.shutdown().await;
    Ok(())
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn log_stats(ctx: &CliContext) {
    let registry = ctx.registry();
    for id in registry.ids() {
        let Some(program) = registry.get(&id) else {
            continue;
        };
        if !program.is_running() {
            continue;
        }
        match program.stats().await {
            Ok(stats) => info!(
                program_id = %id,
                memory = %format_bytes(stats.memory),
                cpu = stats.cpu,
                "Program stats"
            ),
            Err(e) => debug!(program_id = %id, error = %e, "Stats unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::context;
    use kennel_core::Environment;

    #[tokio::test]
    async fn test_log_stats_skips_stopped_programs() {
        let (dir, ctx, factory, _store) = context(&["alpha", "beta"]);
        factory
            .environment_at(&dir.path().join("servers/alpha"))
            .unwrap()
            .set_running(true);

        log_stats(&ctx).await;

        let beta = factory
            .environment_at(&dir.path().join("servers/beta"))
            .unwrap();
        assert!(!beta.is_running());
    }

    #[tokio::test]
    async fn test_disabled_ticker_never_fires() {
        let mut ticker = None;
        let fired = tokio::time::timeout(Duration::from_millis(20), tick(&mut ticker)).await;
        assert!(fired.is_err());
    }
}
