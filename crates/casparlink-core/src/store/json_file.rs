// JSON-file backed config store.
//
// The file holds `{ "inputs": [...], "outputs": [...] }` as pretty JSON.
// Every mutation is applied to a copy of the in-memory state, written to a
// sibling temp file, fsynced and renamed over the original. Only then does
// the in-memory state change.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use super::{ConfigState, ConfigStore};
use crate::error::CoreError;
use crate::model::{ConfigSnapshot, InputRecord, InputUpdate, OutputRecord, OutputUpdate};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<ConfigState>,
}

impl JsonFileStore {
    /// Load `path`. A missing file is an empty config; a file that exists
    /// but cannot be read or parsed is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let snapshot = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| CoreError::Storage {
                message: format!("cannot read {}: {e}", path.display()),
            })?;
            serde_json::from_str::<ConfigSnapshot>(&text).map_err(|e| CoreError::Storage {
                message: format!("cannot parse {}: {e}", path.display()),
            })?
        } else {
            tracing::info!(path = %path.display(), "config file not found, starting empty");
            ConfigSnapshot::default()
        };

        tracing::debug!(
            path = %path.display(),
            inputs = snapshot.inputs.len(),
            outputs = snapshot.outputs.len(),
            "loaded routing config"
        );

        Ok(Self {
            path,
            state: RwLock::new(ConfigState::from_snapshot(snapshot)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<R>(&self, f: impl FnOnce(&ConfigState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply `f` to a copy, persist it, then commit. The write lock is held
    /// throughout so concurrent writers are serialized.
    fn mutate<R>(
        &self,
        f: impl FnOnce(&mut ConfigState) -> Result<R, CoreError>,
    ) -> Result<R, CoreError> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let result = f(&mut next)?;
        self.persist(&next.snapshot())?;
        *guard = next;
        Ok(result)
    }

    fn persist(&self, snapshot: &ConfigSnapshot) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(CoreError::storage)?;
            }
        }

        let mut json = serde_json::to_vec_pretty(snapshot).map_err(CoreError::storage)?;
        json.push(b'\n');

        let tmp = self.path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CoreError::Storage {
                message: format!("cannot write {}: {e}", self.path.display()),
            }
        })
    }
}

impl ConfigStore for JsonFileStore {
    fn snapshot(&self) -> ConfigSnapshot {
        self.read(ConfigState::snapshot)
    }

    fn input(&self, id: &str) -> Option<InputRecord> {
        self.read(|s| s.input(id))
    }

    fn output(&self, id: &str) -> Option<OutputRecord> {
        self.read(|s| s.output(id))
    }

    fn create_input(&self, input: InputRecord) -> Result<InputRecord, CoreError> {
        self.mutate(|s| s.create_input(input))
    }

    fn update_input(&self, id: &str, update: InputUpdate) -> Result<InputRecord, CoreError> {
        self.mutate(|s| s.update_input(id, update))
    }

    fn delete_input(&self, id: &str) -> Result<InputRecord, CoreError> {
        self.mutate(|s| s.delete_input(id))
    }

    fn create_output(&self, output: OutputRecord) -> Result<OutputRecord, CoreError> {
        self.mutate(|s| s.create_output(output))
    }

    fn update_output(&self, id: &str, update: OutputUpdate) -> Result<OutputRecord, CoreError> {
        self.mutate(|s| s.update_output(id, update))
    }

    fn delete_output(&self, id: &str) -> Result<OutputRecord, CoreError> {
        self.mutate(|s| s.delete_output(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("config.json")).unwrap();
        assert_eq!(store.snapshot(), ConfigSnapshot::default());
    }

    #[test]
    fn mutations_survive_reopen_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.create_input(InputRecord::new("cam2", "DECKLINK 2")).unwrap();
        store.create_input(InputRecord::new("cam1", "DECKLINK 1")).unwrap();
        store.create_output(OutputRecord::new("pgm", "1")).unwrap();
        store
            .update_input(
                "cam2",
                InputUpdate {
                    label: Some("Wide".into()),
                    ..InputUpdate::default()
                },
            )
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let ids: Vec<_> = reopened.inputs().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, ["cam2", "cam1"]);
        assert_eq!(reopened.input("cam2").unwrap().label.as_deref(), Some("Wide"));
        assert_eq!(reopened.outputs().len(), 1);
    }

    #[test]
    fn file_uses_inputs_outputs_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.create_input(InputRecord::new("cam3", "DECKLINK 1")).unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            on_disk,
            serde_json::json!({
                "inputs": [{"id": "cam3", "source": "DECKLINK 1"}],
                "outputs": []
            })
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn reads_files_written_by_other_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
              "inputs": [
                {"id": "cam1", "type": "decklink", "source": "DECKLINK 1", "label": "Cam 1", "umd": {"text": "CAM 1"}}
              ],
              "outputs": [{"id": "pgm", "target": "1"}]
            }"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let cam1 = store.input("cam1").unwrap();
        assert_eq!(cam1.kind.as_deref(), Some("decklink"));
        assert_eq!(cam1.umd, Some(serde_json::json!({"text": "CAM 1"})));
        assert_eq!(store.output("pgm").unwrap().target, "1");
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(CoreError::Storage { .. })
        ));
    }

    #[test]
    fn failed_persist_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = dir.path().join("config.json");
        let store = JsonFileStore::open(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let result = store.create_input(InputRecord::new("cam1", "DECKLINK 1"));

        assert!(matches!(result, Err(CoreError::Storage { .. })));
        assert!(store.inputs().is_empty());
    }
}
