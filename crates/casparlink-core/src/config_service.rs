// ── Config service ──
//
// Async face of the config store. Store calls may block on disk, so they
// run on the blocking pool; change events go out only after the store
// reports the mutation durable.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{
    ConfigSnapshot, EventKind, InputRecord, InputUpdate, OutputRecord, OutputUpdate,
};
use crate::store::ConfigStore;
use crate::stream::EventBroadcaster;

#[derive(Clone)]
pub struct ConfigService {
    store: Arc<dyn ConfigStore>,
    events: EventBroadcaster,
}

impl ConfigService {
    pub fn new(store: Arc<dyn ConfigStore>, events: EventBroadcaster) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> Result<ConfigSnapshot, CoreError> {
        self.blocking(|store| Ok(store.snapshot())).await
    }

    pub async fn inputs(&self) -> Result<Vec<InputRecord>, CoreError> {
        self.blocking(|store| Ok(store.inputs())).await
    }

    pub async fn outputs(&self) -> Result<Vec<OutputRecord>, CoreError> {
        self.blocking(|store| Ok(store.outputs())).await
    }

    // ── Inputs ───────────────────────────────────────────────────────

    pub async fn create_input(&self, input: InputRecord) -> Result<InputRecord, CoreError> {
        input.validate()?;
        let created = self.blocking(move |store| store.create_input(input)).await?;
        info!(id = %created.id, source = %created.source, "input created");
        self.events.emit(EventKind::InputAdded {
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub async fn update_input(
        &self,
        id: &str,
        update: InputUpdate,
    ) -> Result<InputRecord, CoreError> {
        let key = id.to_owned();
        let updated = self
            .blocking(move |store| store.update_input(&key, update))
            .await?;
        debug!(id = %updated.id, "input updated");
        self.events.emit(EventKind::InputUpdated {
            id: updated.id.clone(),
        });
        Ok(updated)
    }

    pub async fn delete_input(&self, id: &str) -> Result<InputRecord, CoreError> {
        let key = id.to_owned();
        let removed = self.blocking(move |store| store.delete_input(&key)).await?;
        info!(id = %removed.id, "input deleted");
        self.events.emit(EventKind::InputDeleted {
            id: removed.id.clone(),
        });
        Ok(removed)
    }

    // ── Outputs ──────────────────────────────────────────────────────

    pub async fn create_output(&self, output: OutputRecord) -> Result<OutputRecord, CoreError> {
        output.validate()?;
        let created = self.blocking(move |store| store.create_output(output)).await?;
        info!(id = %created.id, target = %created.target, "output created");
        self.events.emit(EventKind::OutputAdded {
            id: created.id.clone(),
        });
        Ok(created)
    }

    pub async fn update_output(
        &self,
        id: &str,
        update: OutputUpdate,
    ) -> Result<OutputRecord, CoreError> {
        let key = id.to_owned();
        let updated = self
            .blocking(move |store| store.update_output(&key, update))
            .await?;
        debug!(id = %updated.id, "output updated");
        self.events.emit(EventKind::OutputUpdated {
            id: updated.id.clone(),
        });
        Ok(updated)
    }

    pub async fn delete_output(&self, id: &str) -> Result<OutputRecord, CoreError> {
        let key = id.to_owned();
        let removed = self.blocking(move |store| store.delete_output(&key)).await?;
        info!(id = %removed.id, "output deleted");
        self.events.emit(EventKind::OutputDeleted {
            id: removed.id.clone(),
        });
        Ok(removed)
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn blocking<R, F>(&self, f: F) -> Result<R, CoreError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn ConfigStore) -> Result<R, CoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| CoreError::Internal(format!("config task failed: {e}")))?
    }
}
