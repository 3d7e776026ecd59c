use chrono::Utc;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{ConfigSnapshot, ScaffoldState};
use crate::config::ScaffoldConfig;
use crate::errors::StateError;

/// Durable home of a [`ScaffoldState`].
///
/// `load` never writes: a missing document yields a fresh default state that
/// only reaches storage on the first `save`.
pub trait StateStore {
    /// Return the stored state, or a fresh default if nothing is stored.
    fn load(&self) -> Result<ScaffoldState, StateError>;

    /// Stamp `last_updated` and replace the stored document.
    fn save(&mut self, state: &mut ScaffoldState) -> Result<(), StateError>;

    /// Delete the stored document. Deleting nothing is not an error.
    fn reset(&mut self) -> Result<(), StateError>;

    fn exists(&self) -> bool;
}

/// Values used to seed a state that does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    pub project_name: Option<String>,
    pub config: ConfigSnapshot,
}

impl Bootstrap {
    /// Project name and skip list taken from the project configuration.
    pub fn from_config(config: &ScaffoldConfig) -> Self {
        Self {
            project_name: config.project_name(),
            config: ConfigSnapshot {
                skip_phases: config.skip_phases(),
            },
        }
    }

    fn fresh_state(&self) -> ScaffoldState {
        ScaffoldState::new(self.project_name.clone(), self.config.clone(), Utc::now())
    }
}

/// State kept as pretty-printed JSON at a fixed path.
pub struct FileStateStore {
    state_file: PathBuf,
    bootstrap: Bootstrap,
}

impl FileStateStore {
    pub fn new(state_file: PathBuf, bootstrap: Bootstrap) -> Self {
        Self {
            state_file,
            bootstrap,
        }
    }

    /// Store at the configured state file path.
    pub fn for_config(config: &ScaffoldConfig) -> Self {
        Self::new(config.state_file(), Bootstrap::from_config(config))
    }

    pub fn path(&self) -> &Path {
        &self.state_file
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<ScaffoldState, StateError> {
        if !self.state_file.exists() {
            debug!(path = %self.state_file.display(), "no state file, starting fresh");
            return Ok(self.bootstrap.fresh_state());
        }

        let content = fs::read_to_string(&self.state_file).map_err(|source| StateError::Read {
            path: self.state_file.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| StateError::Parse {
            path: self.state_file.clone(),
            source,
        })
    }

    fn save(&mut self, state: &mut ScaffoldState) -> Result<(), StateError> {
        state.last_updated = Some(Utc::now());
        let json = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
        write_atomic(&self.state_file, &json)?;
        debug!(path = %self.state_file.display(), status = %state.status, "state saved");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), StateError> {
        if self.state_file.exists() {
            fs::remove_file(&self.state_file).map_err(|source| StateError::Remove {
                path: self.state_file.clone(),
                source,
            })?;
            info!(path = %self.state_file.display(), "state file removed");
        }
        Ok(())
    }

    fn exists(&self) -> bool {
        self.state_file.exists()
    }
}

/// Write to a temp file beside `path`, fsync, then rename over `path`.
fn write_atomic(path: &Path, content: &str) -> Result<(), StateError> {
    let write_err = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(content.as_bytes()).map_err(write_err)?;
    temp.write_all(b"\n").map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// In-memory store for tests and dry runs.
///
/// Documents are kept serialized so every load goes through the same serde
/// path as the file store.
#[derive(Default)]
pub struct MemoryStateStore {
    document: Option<String>,
    bootstrap: Bootstrap,
}

impl MemoryStateStore {
    pub fn new(bootstrap: Bootstrap) -> Self {
        Self {
            document: None,
            bootstrap,
        }
    }

    /// Start from a raw document, e.g. to simulate a corrupt file.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
            bootstrap: Bootstrap::default(),
        }
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<ScaffoldState, StateError> {
        match &self.document {
            None => Ok(self.bootstrap.fresh_state()),
            Some(doc) => serde_json::from_str(doc).map_err(|source| StateError::Parse {
                path: PathBuf::from("<memory>"),
                source,
            }),
        }
    }

    fn save(&mut self, state: &mut ScaffoldState) -> Result<(), StateError> {
        state.last_updated = Some(Utc::now());
        self.document = Some(serde_json::to_string_pretty(state).map_err(StateError::Serialize)?);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), StateError> {
        self.document = None;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.document.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PhaseStatus, RunStatus};
    use tempfile::tempdir;

    fn make_store() -> (FileStateStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".scaffold").join("state.json");
        let bootstrap = Bootstrap {
            project_name: Some("demo".to_string()),
            config: ConfigSnapshot { skip_phases: vec![6] },
        };
        (FileStateStore::new(path, bootstrap), dir)
    }

    #[test]
    fn test_load_without_file_returns_default_and_writes_nothing() {
        let (store, _dir) = make_store();
        let state = store.load().unwrap();

        assert_eq!(state.project_name.as_deref(), Some("demo"));
        assert_eq!(state.config.skip_phases, vec![6]);
        assert_eq!(state.status, RunStatus::NotStarted);
        assert!(state.current_phase.is_none());
        assert!(!store.exists());
    }

    #[test]
    fn test_two_fresh_loads_have_identical_phase_tables() {
        let (store, _dir) = make_store();
        let a = store.load().unwrap();
        let b = store.load().unwrap();
        assert_eq!(a.phases, b.phases);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_save_then_load_is_deep_equal() {
        let (mut store, _dir) = make_store();
        let mut state = store.load().unwrap();
        let now = Utc::now();
        state.start_phase(1, now).unwrap();
        state.fail_phase(1, "boom", now).unwrap();

        store.save(&mut state).unwrap();
        assert!(store.exists());
        assert!(state.last_updated.is_some());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
        assert_eq!(store.load().unwrap(), loaded);
    }

    #[test]
    fn test_load_ignores_changed_bootstrap_for_existing_file() {
        let (mut store, dir) = make_store();
        let mut state = store.load().unwrap();
        store.save(&mut state).unwrap();

        let other = FileStateStore::new(
            store.path().to_path_buf(),
            Bootstrap {
                project_name: Some("renamed".to_string()),
                config: ConfigSnapshot::default(),
            },
        );
        let loaded = other.load().unwrap();
        assert_eq!(loaded.project_name.as_deref(), Some("demo"));
        assert_eq!(loaded.config.skip_phases, vec![6]);
        drop(dir);
    }

    #[test]
    fn test_corrupt_file_is_a_parse_error_and_left_alone() {
        let (store, _dir) = make_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StateError::Parse { .. }));
        assert!(err.to_string().contains("state.json"));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_saved_file_is_pretty_json_with_string_phase_keys() {
        let (mut store, _dir) = make_store();
        let mut state = store.load().unwrap();
        store.save(&mut state).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["phases"]["10"]["name"], "deployment");
        assert!(content.contains("\n  \"version\""));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (mut store, _dir) = make_store();
        let mut state = store.load().unwrap();
        store.save(&mut state).unwrap();
        store.save(&mut state).unwrap();

        let entries: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_reset_removes_file() {
        let (mut store, _dir) = make_store();
        let mut state = store.load().unwrap();
        state.start_phase(2, Utc::now()).unwrap();
        store.save(&mut state).unwrap();

        store.reset().unwrap();
        assert!(!store.exists());

        let fresh = store.load().unwrap();
        assert!(fresh.current_phase.is_none());
        assert_eq!(fresh.phase(2).unwrap().status, PhaseStatus::Pending);

        // Resetting twice is fine.
        store.reset().unwrap();
    }

    #[test]
    fn test_recovery_after_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let mut store = FileStateStore::new(path.clone(), Bootstrap::default());
            let mut state = store.load().unwrap();
            state.start_phase(1, Utc::now()).unwrap();
            state.complete_phase(1, Utc::now()).unwrap();
            store.save(&mut state).unwrap();
        }

        {
            let store = FileStateStore::new(path.clone(), Bootstrap::default());
            let state = store.load().unwrap();
            assert_eq!(state.phase(1).unwrap().status, PhaseStatus::Completed);
            assert_eq!(state.current_phase, Some(1));
        }
    }

    #[test]
    fn test_memory_store_round_trips() {
        let mut store = MemoryStateStore::new(Bootstrap::default());
        assert!(!store.exists());

        let mut state = store.load().unwrap();
        state.start_phase(4, Utc::now()).unwrap();
        store.save(&mut state).unwrap();

        assert!(store.document().unwrap().contains("\"in_progress\""));
        assert_eq!(store.load().unwrap(), state);

        store.reset().unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn test_memory_store_corrupt_document() {
        let store = MemoryStateStore::with_document("[]");
        assert!(matches!(store.load(), Err(StateError::Parse { .. })));
    }
}
