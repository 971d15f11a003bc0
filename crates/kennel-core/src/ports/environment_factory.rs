//! Environment factory port.

use std::path::PathBuf;
use std::sync::Arc;

use super::environment::{Environment, EnvironmentKind};

/// Builds environments for programs as they are loaded or created.
///
/// The registry owns no knowledge of how a variant is constructed; runtime
/// adapters decide buffer sizes, forwarding and PTY details.
pub trait EnvironmentFactory: Send + Sync {
    /// Build an environment of `kind` rooted at `root`.
    fn build(&self, kind: EnvironmentKind, root: PathBuf) -> Arc<dyn Environment>;
}
