// ── Config store ──
//
// Durable mapping of named inputs and outputs. The rest of the crate only
// sees the `ConfigStore` trait; `MemoryStore` and `JsonFileStore` are the
// two implementations shipped here.

mod json_file;
mod memory;
mod table;

use crate::error::CoreError;
use crate::model::{ConfigSnapshot, InputRecord, InputUpdate, OutputRecord, OutputUpdate};

use table::RecordTable;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Keyed storage for routing configuration.
///
/// Implementations are synchronous and may block on I/O; async callers go
/// through [`ConfigService`](crate::ConfigService), which moves calls onto
/// the blocking pool. A mutation that returns `Ok` has been made durable.
/// A mutation that returns `Err` has left the store unchanged.
pub trait ConfigStore: Send + Sync + 'static {
    fn snapshot(&self) -> ConfigSnapshot;

    fn inputs(&self) -> Vec<InputRecord> {
        self.snapshot().inputs
    }

    fn outputs(&self) -> Vec<OutputRecord> {
        self.snapshot().outputs
    }

    fn input(&self, id: &str) -> Option<InputRecord>;
    fn output(&self, id: &str) -> Option<OutputRecord>;

    fn create_input(&self, input: InputRecord) -> Result<InputRecord, CoreError>;
    fn update_input(&self, id: &str, update: InputUpdate) -> Result<InputRecord, CoreError>;
    fn delete_input(&self, id: &str) -> Result<InputRecord, CoreError>;

    fn create_output(&self, output: OutputRecord) -> Result<OutputRecord, CoreError>;
    fn update_output(&self, id: &str, update: OutputUpdate) -> Result<OutputRecord, CoreError>;
    fn delete_output(&self, id: &str) -> Result<OutputRecord, CoreError>;
}

// ── Shared in-memory state ───────────────────────────────────────────

/// Both tables together; the unit a store clones, mutates and commits.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConfigState {
    inputs: RecordTable<InputRecord>,
    outputs: RecordTable<OutputRecord>,
}

impl ConfigState {
    /// Build from a loaded snapshot, dropping duplicate ids (first wins).
    pub(crate) fn from_snapshot(snapshot: ConfigSnapshot) -> Self {
        let (inputs, dup_inputs) = RecordTable::from_records(snapshot.inputs);
        let (outputs, dup_outputs) = RecordTable::from_records(snapshot.outputs);

        for id in dup_inputs {
            tracing::warn!(%id, "duplicate input id in config; keeping the first");
        }
        for id in dup_outputs {
            tracing::warn!(%id, "duplicate output id in config; keeping the first");
        }

        Self { inputs, outputs }
    }

    pub(crate) fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            inputs: self.inputs.values(),
            outputs: self.outputs.values(),
        }
    }

    pub(crate) fn input(&self, id: &str) -> Option<InputRecord> {
        self.inputs.get(id).cloned()
    }

    pub(crate) fn output(&self, id: &str) -> Option<OutputRecord> {
        self.outputs.get(id).cloned()
    }

    pub(crate) fn create_input(&mut self, input: InputRecord) -> Result<InputRecord, CoreError> {
        input.validate()?;
        self.inputs.insert(input.clone())?;
        Ok(input)
    }

    pub(crate) fn update_input(
        &mut self,
        id: &str,
        update: InputUpdate,
    ) -> Result<InputRecord, CoreError> {
        self.inputs.replace(id, |current| update.apply_to(current))
    }

    pub(crate) fn delete_input(&mut self, id: &str) -> Result<InputRecord, CoreError> {
        self.inputs.remove(id)
    }

    pub(crate) fn create_output(
        &mut self,
        output: OutputRecord,
    ) -> Result<OutputRecord, CoreError> {
        output.validate()?;
        self.outputs.insert(output.clone())?;
        Ok(output)
    }

    pub(crate) fn update_output(
        &mut self,
        id: &str,
        update: OutputUpdate,
    ) -> Result<OutputRecord, CoreError> {
        self.outputs.replace(id, |current| update.apply_to(current))
    }

    pub(crate) fn delete_output(&mut self, id: &str) -> Result<OutputRecord, CoreError> {
        self.outputs.remove(id)
    }
}
