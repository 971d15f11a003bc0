//! Core of the kennel workload daemon.
//!
//! Domain types for program definitions, the ports an execution environment
//! and its collaborators must implement, the install pipeline, and the
//! program lifecycle services built on top of them. Concrete process, PTY and
//! storage adapters live in `kennel-runtime`.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod install;
pub mod ports;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use domain::{
    EnvironmentSpec, InstallSection, OperationSpec, ParamType, ParamValue, ParameterDescriptor,
    ParameterError, ProgramData, ProgramDefinition, RunSpec, replace_tokens,
};
pub use install::{InstallProcess, Operation, OperationError, StepError};
pub use ports::{
    ArtifactFetcher, AuthError, ConfigProvider, ConsoleListener, ConsoleSnapshot, Environment,
    EnvironmentError, EnvironmentFactory, EnvironmentKind, FetchError, ListenerError, ListenerId,
    ProcessStats, ProgramPorts, ProgramStore, StaticConfig, StoreError, TokenInfo,
    TokenIntrospector, WaitOutcome,
};
pub use services::{
    DataOverrides, Program, ProgramError, ProgramRegistry, ProgramState, RegistryError,
    STOP_GRACE_PERIOD,
};
