//! Program store trait definition.
//!
//! This port defines the interface for persisting program definitions.
//! Implementations handle all storage details internally.

use super::StoreError;
use crate::domain::ProgramDefinition;

/// Persistence for program definitions, keyed by program id.
///
/// # Design Rules
///
/// - Works with the domain `ProgramDefinition` directly
/// - Implementation owns the on-disk document format
/// - `remove` is idempotent
#[cfg_attr(test, mockall::automock)]
pub trait ProgramStore: Send + Sync {
    /// Ids of every stored definition.
    fn ids(&self) -> Result<Vec<String>, StoreError>;

    /// Load one definition.
    ///
    /// Returns `Err(StoreError::NotFound)` if nothing is stored under `id`.
    fn load(&self, id: &str) -> Result<ProgramDefinition, StoreError>;

    /// Persist a definition, replacing any previous version.
    fn save(&self, id: &str, definition: &ProgramDefinition) -> Result<(), StoreError>;

    /// Remove a definition. Missing ids are not an error.
    fn remove(&self, id: &str) -> Result<(), StoreError>;
}
