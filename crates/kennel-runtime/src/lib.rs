//! OS-facing adapters for the kennel daemon.
//!
//! Process environments (piped and pseudo-terminal), console plumbing, and
//! the file, HTTP and environment-variable implementations of the ports
//! declared in `kennel-core`.

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod console;
pub mod environment;
pub mod fetch;
pub mod process;
pub mod store;

// Re-export the environment implementations and their factory
pub use environment::{
    DirectEnvironment, EnvironmentSettings, PtyEnvironment, RuntimeEnvironmentFactory,
};

// Re-export console primitives
pub use console::{BroadcastHub, ConsoleBuffer, ConsoleSink, OutputWriter};

// Re-export port adapters
pub use auth::HttpTokenIntrospector;
pub use config::EnvConfigProvider;
pub use fetch::HttpFetcher;
pub use store::FileProgramStore;
