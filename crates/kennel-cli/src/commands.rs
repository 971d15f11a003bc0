//! Main commands enum.

use clap::Subcommand;
use std::path::PathBuf;

/// Available commands.
///
/// Program ids double as directory and file names, so they are limited to
/// ASCII letters, digits, `-`, `_` and `.`.
#[derive(Subcommand)]
pub enum Commands {
    /// List every program with its state
    List {
        /// Print machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a program's definition, state and network address
    Show {
        /// Program id
        id: String,
    },

    /// Register a program from a definition document and install it
    Create {
        /// Program id
        id: String,
        /// Path to the `{"kennel": {...}}` definition document
        definition: PathBuf,
    },

    /// Re-run a program's install steps
    Install {
        /// Program id
        id: String,
        /// Let the environment refresh itself before reinstalling
        #[arg(long)]
        update: bool,
    },

    /// Run one program in the foreground, streaming its console
    Start {
        /// Program id
        id: String,
    },

    /// Change program parameters (`name=value`; `name=` removes it)
    Edit {
        /// Program id
        id: String,
        /// Parameter assignments
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Stop and delete a program with all of its files
    Delete {
        /// Program id
        id: String,
    },

    /// Check an access token against the authorization service
    Authorize {
        /// Program id the token must be bound to
        id: String,
        /// Access token to introspect
        token: String,
        /// Scopes the token must carry (e.g. `server.start`)
        #[arg(short, long = "scope")]
        scopes: Vec<String>,
    },

    /// Run as a daemon: autostart programs and supervise them until Ctrl+C
    Run {
        /// Do not start programs marked for autostart
        #[arg(long)]
        no_autostart: bool,
        /// Interval between resource usage log lines, in seconds (0 disables)
        #[arg(long, default_value_t = 60)]
        stats_interval: u64,
    },
}
