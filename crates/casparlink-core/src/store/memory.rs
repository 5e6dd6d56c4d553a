use std::sync::{PoisonError, RwLock};

use super::{ConfigState, ConfigStore};
use crate::error::CoreError;
use crate::model::{ConfigSnapshot, InputRecord, InputUpdate, OutputRecord, OutputUpdate};

/// Non-durable store for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<ConfigState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records. Duplicate ids keep the first record.
    pub fn with_snapshot(snapshot: ConfigSnapshot) -> Self {
        Self {
            state: RwLock::new(ConfigState::from_snapshot(snapshot)),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&ConfigState) -> R) -> R {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<R>(&self, f: impl FnOnce(&mut ConfigState) -> R) -> R {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ConfigStore for MemoryStore {
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
        self.write(|s| s.create_input(input))
    }

    fn update_input(&self, id: &str, update: InputUpdate) -> Result<InputRecord, CoreError> {
        self.write(|s| s.update_input(id, update))
    }

    fn delete_input(&self, id: &str) -> Result<InputRecord, CoreError> {
        self.write(|s| s.delete_input(id))
    }

    fn create_output(&self, output: OutputRecord) -> Result<OutputRecord, CoreError> {
        self.write(|s| s.create_output(output))
    }

    fn update_output(&self, id: &str, update: OutputUpdate) -> Result<OutputRecord, CoreError> {
        self.write(|s| s.update_output(id, update))
    }

    fn delete_output(&self, id: &str) -> Result<OutputRecord, CoreError> {
        self.write(|s| s.delete_output(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn duplicate_create_leaves_store_unchanged() {
        let store = MemoryStore::new();
        store.create_input(InputRecord::new("cam3", "DECKLINK 1")).unwrap();
        let before = store.snapshot();

        let err = store
            .create_input(InputRecord::new("cam3", "DECKLINK 2"))
            .unwrap_err();

        assert!(matches!(err, CoreError::AlreadyExists { .. }));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn update_and_delete_of_missing_id_are_not_found() {
        let store = MemoryStore::new();
        store.create_output(OutputRecord::new("pgm", "1")).unwrap();
        let before = store.snapshot();

        assert!(matches!(
            store.update_output("aux", OutputUpdate::default()),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_input("cam9"),
            Err(CoreError::NotFound { .. })
        ));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn invalid_records_are_rejected() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.create_input(InputRecord::new("cam1", "")),
            Err(CoreError::InvalidRequest { .. })
        ));
        assert!(store.inputs().is_empty());
    }

    #[test]
    fn seeded_store_keeps_first_duplicate() {
        let store = MemoryStore::with_snapshot(ConfigSnapshot {
            inputs: vec![
                InputRecord::new("cam1", "DECKLINK 1"),
                InputRecord::new("cam1", "DECKLINK 2"),
            ],
            outputs: vec![],
        });

        assert_eq!(store.inputs().len(), 1);
        assert_eq!(store.input("cam1").unwrap().source, "DECKLINK 1");
    }
}
