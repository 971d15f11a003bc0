//! Core services - the application's business logic layer.
//!
//! Services orchestrate between ports (trait interfaces) and domain logic.
//! They never see a concrete process, PTY or file format.

mod program;
mod registry;

pub use program::{DataOverrides, Program, ProgramError, ProgramState, STOP_GRACE_PERIOD};
pub use registry::{ProgramRegistry, RegistryError};
