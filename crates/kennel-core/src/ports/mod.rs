//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No process, PTY or HTTP client types in any signature
//! - Intent-based methods for the environment (not implementation-leaking)
//! - Stores are minimal and keyed by program id

pub mod auth;
pub mod config;
pub mod console;
pub mod environment;
pub mod environment_factory;
pub mod fetcher;
pub mod program_store;

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub use auth::{AuthError, TokenInfo, TokenIntrospector, authorize};
pub use config::{ConfigProvider, StaticConfig, keys};
pub use console::{ConsoleListener, ListenerError, ListenerId};
pub use environment::{
    ConsoleSnapshot, Environment, EnvironmentKind, ProcessStats, WaitOutcome,
};
pub use environment_factory::EnvironmentFactory;
pub use fetcher::ArtifactFetcher;
pub use program_store::ProgramStore;

/// Container for the collaborators a [`Program`](crate::services::Program) needs
/// besides its environment.
///
/// Mirrors how adapters wire repositories: the composition root builds one of
/// these and hands clones to every program.
#[derive(Clone)]
pub struct ProgramPorts {
    /// Persistence for program definitions.
    pub store: Arc<dyn ProgramStore>,
    /// Fetches remote artifacts for `download` install steps.
    pub fetcher: Arc<dyn ArtifactFetcher>,
}

impl ProgramPorts {
    /// Create a new ports container.
    pub fn new(store: Arc<dyn ProgramStore>, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self { store, fetcher }
    }
}

/// Errors surfaced by an [`Environment`].
///
/// These are expected conditions, returned as values; the program layer logs
/// them and mirrors a short line to the console before passing them on.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    /// A start was requested while a live process is tracked.
    #[error("A process is already running ({pid})")]
    AlreadyRunning { pid: u32 },

    /// The operation needs a live process and there is none.
    #[error("Server not running")]
    NotRunning,

    /// Input was sent but no input stream was ever established.
    #[error("Main process has not been started")]
    NotStarted,

    /// The OS failed to create the process or allocate a pseudo-terminal.
    #[error("Failed to start {command}: {reason}")]
    SpawnFailed { command: String, reason: String },

    /// Creating or removing the environment's directory failed.
    #[error("Filesystem error at {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },

    /// Raw I/O failure on the process streams.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from a [`ProgramStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No definition is stored under the id.
    #[error("Program definition not found: {0}")]
    NotFound(String),

    /// The stored document could not be parsed or produced.
    #[error("Invalid program definition {id}: {reason}")]
    Serialization { id: String, reason: String },

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from an [`ArtifactFetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote request failed or returned a non-success status.
    #[error("Download of {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// Writing the fetched bytes to disk failed.
    #[error("Failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}
