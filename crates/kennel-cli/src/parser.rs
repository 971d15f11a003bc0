//! Main CLI parser and top-level argument handling.

use clap::Parser;
use std::path::PathBuf;

use crate::commands::Commands;

/// Workload daemon: installs, runs and supervises programs.
#[derive(Parser)]
#[command(name = "kenneld")]
#[command(about = "Install, run and supervise server workloads")]
#[command(version)]
pub struct Cli {
    /// Directory holding one root directory per program
    #[arg(long = "servers-dir", env = "KENNEL_SERVERSFOLDER", global = true)]
    pub servers_dir: Option<PathBuf>,

    /// Directory holding the program definition documents
    #[arg(long = "programs-dir", env = "KENNEL_PROGRAMSFOLDER", global = true)]
    pub programs_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "kenneld",
            "list",
            "--verbose",
            "--servers-dir",
            "/srv/kennel/servers",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.servers_dir, Some(PathBuf::from("/srv/kennel/servers")));
        assert!(matches!(cli.command, Some(Commands::List { json: false })));
    }
}
