// ── Keyed record table ──
//
// Insertion-ordered storage for one record type with the uniqueness and
// existence checks every store needs. Mutations either fully apply or
// leave the table untouched.

use indexmap::IndexMap;

use crate::error::CoreError;
use crate::model::{InputRecord, OutputRecord};

/// A record addressable by a unique string id.
pub(crate) trait Record: Clone {
    /// Entity name used in error messages, e.g. `"input"`.
    const ENTITY: &'static str;

    fn id(&self) -> &str;
}

impl Record for InputRecord {
    const ENTITY: &'static str = "input";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for OutputRecord {
    const ENTITY: &'static str = "output";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordTable<T: Record> {
    by_id: IndexMap<String, T>,
}

impl<T: Record> Default for RecordTable<T> {
    fn default() -> Self {
        Self {
            by_id: IndexMap::new(),
        }
    }
}

impl<T: Record> RecordTable<T> {
    /// Build from loaded records. Later duplicates are dropped and their
    /// ids returned so the caller can report them.
    pub(crate) fn from_records(records: impl IntoIterator<Item = T>) -> (Self, Vec<String>) {
        let mut table = Self::default();
        let mut duplicates = Vec::new();
        for record in records {
            let id = record.id().to_owned();
            if table.by_id.contains_key(&id) {
                duplicates.push(id);
            } else {
                table.by_id.insert(id, record);
            }
        }
        (table, duplicates)
    }

    pub(crate) fn get(&self, id: &str) -> Option<&T> {
        self.by_id.get(id)
    }

    /// Add a new record. Fails with `AlreadyExists` if the id is taken.
    pub(crate) fn insert(&mut self, record: T) -> Result<(), CoreError> {
        if self.by_id.contains_key(record.id()) {
            return Err(CoreError::AlreadyExists {
                entity_type: T::ENTITY.into(),
                id: record.id().to_owned(),
            });
        }
        self.by_id.insert(record.id().to_owned(), record);
        Ok(())
    }

    /// Replace the record at `id` with `f(current)`, keeping its position.
    pub(crate) fn replace(
        &mut self,
        id: &str,
        f: impl FnOnce(&T) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let slot = self.by_id.get_mut(id).ok_or_else(|| not_found::<T>(id))?;
        let updated = f(slot)?;
        *slot = updated.clone();
        Ok(updated)
    }

    pub(crate) fn remove(&mut self, id: &str) -> Result<T, CoreError> {
        self.by_id.shift_remove(id).ok_or_else(|| not_found::<T>(id))
    }

    pub(crate) fn values(&self) -> Vec<T> {
        self.by_id.values().cloned().collect()
    }
}

fn not_found<T: Record>(id: &str) -> CoreError {
    CoreError::NotFound {
        entity_type: T::ENTITY.into(),
        id: id.to_owned(),
    }
}
