//! Command-line front end for the kennel daemon.
//!
//! `kenneld` wires the runtime adapters into a [`ProgramRegistry`](kennel_core::ProgramRegistry)
//! and exposes the program lifecycle as subcommands. `kenneld run` keeps the
//! registry alive as a long-running daemon.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;
