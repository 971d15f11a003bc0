//! CLI-specific error types and mappings.
//!
//! Maps registry and program failures to exit codes and user-facing
//! messages.

use kennel_core::{AuthError, EnvironmentError, ProgramError, RegistryError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// No program with the given id.
    #[error("Program not found: {0}")]
    NotFound(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Definition document or store error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Process execution error.
    #[error("Process error: {0}")]
    Process(String),

    /// Install step or hook failure.
    #[error("Install error: {0}")]
    Install(String),

    /// The token does not grant what was asked for.
    #[error("Not authorized: {0}")]
    Unauthorized(String),
}

impl CliError {
    /// Map error to an exit code following sysexits.h.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => 66,     // EX_NOINPUT
            Self::Arguments(_) => 2,     // EX_USAGE
            Self::Io(_) => 74,           // EX_IOERR
            Self::Config(_) => 78,       // EX_CONFIG
            Self::Process(_) => 71,      // EX_OSERR
            Self::Install(_) => 70,      // EX_SOFTWARE
            Self::Unauthorized(_) => 77, // EX_NOPERM
        }
    }
}

impl From<ProgramError> for CliError {
    fn from(err: ProgramError) -> Self {
        match err {
            ProgramError::Environment(EnvironmentError::Filesystem { .. } | EnvironmentError::Io(_))
            | ProgramError::Io(_) => Self::Io(err.to_string()),
            ProgramError::Environment(_) | ProgramError::Destroyed(_) => {
                Self::Process(err.to_string())
            }
            ProgramError::InstallStepFailure { .. } | ProgramError::HookFailed { .. } => {
                Self::Install(err.to_string())
            }
            ProgramError::Validation(_) => Self::Arguments(err.to_string()),
            ProgramError::Store(_) => Self::Config(err.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => Self::NotFound(id),
            RegistryError::AlreadyExists(_) | RegistryError::InvalidId(_) => {
                Self::Arguments(err.to_string())
            }
            RegistryError::Program(e) => e.into(),
            RegistryError::Store(e) => Self::Config(e.to_string()),
        }
    }
}

impl From<AuthError> for CliError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Service(reason) => Self::Process(reason),
            other => Self::Unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_core::{OperationError, StoreError};

    #[test]
    fn test_registry_errors_map_to_exit_codes() {
        assert_eq!(
            CliError::from(RegistryError::NotFound("alpha".into())).exit_code(),
            66
        );
        assert_eq!(
            CliError::from(RegistryError::InvalidId("../x".into())).exit_code(),
            2
        );
        assert_eq!(
            CliError::from(RegistryError::Store(StoreError::Storage("disk".into()))).exit_code(),
            78
        );
    }

    #[test]
    fn test_program_errors_keep_their_message() {
        let err = CliError::from(RegistryError::Program(ProgramError::InstallStepFailure {
            step: 2,
            operation: "command",
            source: OperationError::CommandFailed {
                command: "false".into(),
                exit_code: Some(1),
            },
        }));
        assert_eq!(err.exit_code(), 70);
        assert!(err.to_string().contains("Install step 2 (command)"));

        let err = CliError::from(ProgramError::Environment(EnvironmentError::NotRunning));
        assert!(matches!(err, CliError::Process(_)));
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(CliError::from(AuthError::Inactive).exit_code(), 77);
        assert!(matches!(
            CliError::from(AuthError::Service("down".into())),
            CliError::Process(reason) if reason == "down"
        ));
    }
}
