//! Program registry - the daemon's collection of managed programs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{error, info, warn};

use super::program::{Program, ProgramError};
use crate::domain::ProgramDefinition;
use crate::ports::{EnvironmentFactory, ProgramPorts, StoreError};

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Program not found: {0}")]
    NotFound(String),

    #[error("Program already exists: {0}")]
    AlreadyExists(String),

    /// Ids become directory and file names, so they must be a single plain
    /// path segment.
    #[error("Invalid program id: {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn validate_id(id: &str) -> Result<(), RegistryError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidId(id.to_string()))
    }
}

/// Owns every program and builds their environments.
pub struct ProgramRegistry {
    servers_dir: PathBuf,
    factory: Arc<dyn EnvironmentFactory>,
    ports: ProgramPorts,
    programs: RwLock<BTreeMap<String, Arc<Program>>>,
}

impl ProgramRegistry {
    /// Program roots live at `<servers_dir>/<id>`.
    pub fn new(
        servers_dir: impl Into<PathBuf>,
        factory: Arc<dyn EnvironmentFactory>,
        ports: ProgramPorts,
    ) -> Self {
        Self {
            servers_dir: servers_dir.into(),
            factory,
            ports,
            programs: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn servers_dir(&self) -> &Path {
        &self.servers_dir
    }

    fn build(&self, id: &str, definition: ProgramDefinition) -> Arc<Program> {
        let environment = self
            .factory
            .build(definition.environment_kind(), self.servers_dir.join(id));
        Arc::new(Program::new(
            id,
            definition,
            environment,
            self.ports.clone(),
        ))
    }

    fn insert(&self, program: Arc<Program>) {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(program.id().to_string(), program);
    }

    /// Load every stored definition. Definitions that fail to load are logged
    /// and skipped.
    ///
    /// Returns the number of programs loaded.
    pub fn load_all(&self) -> Result<usize, RegistryError> {
        let mut loaded = 0;
        for id in self.ports.store.ids()? {
            if let Err(e) = validate_id(&id) {
                warn!(program_id = %id, error = %e, "Skipping program");
                continue;
            }
            match self.ports.store.load(&id) {
                Ok(definition) => {
                    self.insert(self.build(&id, definition));
                    loaded += 1;
                }
                Err(e) => error!(program_id = %id, error = %e, "Failed to load program"),
            }
        }
        info!(count = loaded, "Loaded programs");
        Ok(loaded)
    }

    /// Register, persist, allocate and install a new program.
    pub async fn create(
        &self,
        id: &str,
        definition: ProgramDefinition,
    ) -> Result<Arc<Program>, RegistryError> {
        validate_id(id)?;
        if self.get(id).is_some() {
            return Err(RegistryError::AlreadyExists(id.to_string()));
        }

        self.ports.store.save(id, &definition)?;
        let program = self.build(id, definition);
        self.insert(Arc::clone(&program));
        info!(program_id = %id, "Program created");

        program.create().await?;
        program.install().await?;
        Ok(program)
    }

    /// Destroy a program and forget its definition.
    pub async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        let program = self
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        program.destroy().await?;
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        self.ports.store.remove(id)?;
        info!(program_id = %id, "Program deleted");
        Ok(())
    }

    /// Re-read a program's definition from the store and apply it.
    pub fn reload(&self, id: &str) -> Result<(), RegistryError> {
        let program = self
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let definition = self.ports.store.load(id)?;
        program.reload(definition);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Program>> {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Ids of all registered programs, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn all(&self) -> Vec<Arc<Program>> {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Start every enabled program marked for autostart.
    ///
    /// Failures are logged and do not stop the remaining programs. Returns the
    /// number of programs started.
    pub async fn autostart(&self) -> usize {
        let mut started = 0;
        for program in self.all() {
            if !(program.is_enabled() && program.is_autostart()) {
                continue;
            }
            match program.start().await {
                Ok(()) => started += 1,
                Err(e) => error!(program_id = %program.id(), error = %e, "Autostart failed"),
            }
        }
        started
    }

    /// Kill every running program.
    pub async fn shutdown(&self) {
        for program in self.all() {
            if !program.is_running() {
                continue;
            }
            if let Err(e) = program.kill().await {
                error!(program_id = %program.id(), error = %e, "Failed to kill program on shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunSpec;
    use crate::ports::program_store::MockProgramStore;
    use crate::ports::{Environment, EnvironmentKind, ProgramStore};
    use crate::testing::{FakeEnvironmentFactory, MemoryProgramStore, StaticFetcher};

    fn definition(enabled: bool, autostart: bool) -> ProgramDefinition {
        ProgramDefinition {
            run: RunSpec {
                program: "sleep".to_string(),
                arguments: vec!["60".to_string()],
                enabled,
                autostart,
                ..RunSpec::default()
            },
            ..ProgramDefinition::default()
        }
    }

    fn registry(
        dir: &Path,
        store: Arc<dyn ProgramStore>,
    ) -> (ProgramRegistry, Arc<FakeEnvironmentFactory>) {
        let factory = Arc::new(FakeEnvironmentFactory::new());
        let registry = ProgramRegistry::new(
            dir,
            Arc::clone(&factory) as Arc<dyn EnvironmentFactory>,
            ProgramPorts::new(store, Arc::new(StaticFetcher::default())),
        );
        (registry, factory)
    }

    #[test]
    fn test_load_all_skips_broken_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MockProgramStore::new();
        store
            .expect_ids()
            .returning(|| Ok(vec!["alpha".to_string(), "broken".to_string()]));
        store.expect_load().returning(|id| {
            if id == "alpha" {
                let mut def = definition(true, false);
                def.environment = Some(crate::domain::EnvironmentSpec {
                    kind: EnvironmentKind::Tty,
                });
                Ok(def)
            } else {
                Err(StoreError::Serialization {
                    id: id.to_string(),
                    reason: "bad json".to_string(),
                })
            }
        });
        let (registry, factory) = registry(dir.path(), Arc::new(store));

        assert_eq!(registry.load_all().unwrap(), 1);
        assert_eq!(registry.ids(), vec!["alpha"]);
        let env = factory.environment_at(&dir.path().join("alpha")).unwrap();
        assert_eq!(env.kind(), EnvironmentKind::Tty);
    }

    #[tokio::test]
    async fn test_create_persists_and_installs() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryProgramStore::new());
        let (registry, _factory) = registry(dir.path(), Arc::clone(&store) as Arc<dyn ProgramStore>);

        let program = registry.create("alpha", definition(true, false)).await.unwrap();

        assert!(dir.path().join("alpha").is_dir());
        assert!(store.load("alpha").is_ok());
        assert_eq!(program.state(), crate::services::ProgramState::Stopped);

        let err = registry
            .create("alpha", definition(true, false))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _factory) = registry(dir.path(), Arc::new(MemoryProgramStore::new()));

        for id in ["", "..", "a/b"] {
            let err = registry.create(id, definition(true, false)).await.unwrap_err();
            assert!(matches!(err, RegistryError::InvalidId(_)), "{id}");
        }
    }

    #[tokio::test]
    async fn test_delete_removes_files_and_definition() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryProgramStore::new());
        let (registry, _factory) = registry(dir.path(), Arc::clone(&store) as Arc<dyn ProgramStore>);
        registry.create("alpha", definition(true, false)).await.unwrap();

        registry.delete("alpha").await.unwrap();

        assert!(!dir.path().join("alpha").exists());
        assert!(registry.get("alpha").is_none());
        assert!(matches!(store.load("alpha"), Err(StoreError::NotFound(_))));
        assert!(matches!(
            registry.delete("alpha").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_autostart_only_starts_enabled_autostart_programs() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryProgramStore::with([
            ("auto".to_string(), definition(true, true)),
            ("disabled".to_string(), definition(false, true)),
            ("manual".to_string(), definition(true, false)),
        ]));
        let (registry, factory) = registry(dir.path(), store);
        registry.load_all().unwrap();

        assert_eq!(registry.autostart().await, 1);

        let running: Vec<_> = ["auto", "disabled", "manual"]
            .into_iter()
            .filter(|id| {
                factory
                    .environment_at(&dir.path().join(id))
                    .unwrap()
                    .is_running()
            })
            .collect();
        assert_eq!(running, vec!["auto"]);

        registry.shutdown().await;
        assert!(!registry.get("auto").unwrap().is_running());
    }

    #[test]
    fn test_reload_applies_stored_definition() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryProgramStore::with([(
            "alpha".to_string(),
            definition(true, false),
        )]));
        let (registry, _factory) = registry(dir.path(), Arc::clone(&store) as Arc<dyn ProgramStore>);
        registry.load_all().unwrap();

        store.save("alpha", &definition(true, true)).unwrap();
        registry.reload("alpha").unwrap();

        assert!(registry.get("alpha").unwrap().is_autostart());
    }
}
