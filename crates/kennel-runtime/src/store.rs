//! File-backed program store: one `<id>.json` document per program.

use kennel_core::{ProgramDefinition, ProgramStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "json";

/// [`ProgramStore`] persisting definitions under a directory.
#[derive(Debug, Clone)]
pub struct FileProgramStore {
    dir: PathBuf,
}

impl FileProgramStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }
}

fn storage(path: &Path, err: &std::io::Error) -> StoreError {
    StoreError::Storage(format!("{}: {err}", path.display()))
}

impl ProgramStore for FileProgramStore {
    fn ids(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage(&self.dir, &e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| storage(&self.dir, &e))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<ProgramDefinition, StoreError> {
        let path = self.path_for(id);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(storage(&path, &e)),
        };
        ProgramDefinition::from_json(&json).map_err(|e| StoreError::Serialization {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn save(&self, id: &str, definition: &ProgramDefinition) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| storage(&self.dir, &e))?;
        let path = self.path_for(id);
        definition.save(&path).map_err(|e| storage(&path, &e))?;
        debug!(program_id = %id, path = %path.display(), "Saved program definition");
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id);
        match std::fs::remove_file(&path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(storage(&path, &e)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kennel_core::domain::RunSpec;

    fn definition(program: &str) -> ProgramDefinition {
        ProgramDefinition {
            run: RunSpec {
                program: program.to_string(),
                ..RunSpec::default()
            },
            ..ProgramDefinition::default()
        }
    }

    #[test]
    fn test_save_then_list_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProgramStore::new(dir.path().join("programs"));

        store.save("beta", &definition("b")).unwrap();
        store.save("alpha", &definition("a")).unwrap();
        std::fs::write(store.dir().join("notes.txt"), "x").unwrap();

        assert_eq!(store.ids().unwrap(), vec!["alpha", "beta"]);
        assert_eq!(store.load("alpha").unwrap().run.program, "a");
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProgramStore::new(dir.path().join("absent"));
        assert!(store.ids().unwrap().is_empty());
        assert!(matches!(store.load("alpha"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_document_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProgramStore::new(dir.path());
        std::fs::write(store.path_for("broken"), "{\"kennel\": 3}").unwrap();

        assert!(matches!(
            store.load("broken"),
            Err(StoreError::Serialization { id, .. }) if id == "broken"
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProgramStore::new(dir.path());
        store.save("alpha", &definition("a")).unwrap();

        store.remove("alpha").unwrap();
        store.remove("alpha").unwrap();
        assert!(!store.path_for("alpha").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_documents_are_group_writable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileProgramStore::new(dir.path());
        store.save("alpha", &definition("a")).unwrap();

        let mode = std::fs::metadata(store.path_for("alpha"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o664);
    }
}
