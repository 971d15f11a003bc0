//! Core domain types.
//!
//! These types describe programs as persisted and edited. They have no
//! infrastructure dependencies beyond serde.

pub mod definition;
pub mod parameter;
pub mod tokens;

pub use definition::{
    DEFINITION_FILE_MODE, DOCUMENT_ROOT_KEY, EnvironmentSpec, InstallSection, OperationSpec,
    ProgramDefinition, RunSpec,
};
pub use parameter::{
    ParamType, ParamValue, ParameterDescriptor, ParameterError, ProgramData, resolved_values,
};
pub use tokens::{replace_tokens, replace_tokens_in_all};
