// ── Routing configuration records ──
//
// Named inputs and outputs as persisted by a `ConfigStore`. Field names
// match the on-disk `config.json` layout.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A named source the device can play, e.g. a capture card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Device-resolvable locator, e.g. `DECKLINK 1`. Opaque to us.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Under-monitor-display tag. Stored and returned untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub umd: Option<serde_json::Value>,
}

impl InputRecord {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            source: source.into(),
            label: None,
            umd: None,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require("id", &self.id)?;
        require("source", &self.source)
    }
}

/// A named destination on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl OutputRecord {
    pub fn new(id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            target: target.into(),
            label: None,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        require("id", &self.id)?;
        require("target", &self.target)
    }
}

// ── Partial updates ──────────────────────────────────────────────────

/// Fields to change on an existing input. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputUpdate {
    /// Accepted only when equal to the record's id; ids never change.
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub label: Option<String>,
    pub umd: Option<serde_json::Value>,
}

impl InputUpdate {
    /// Merge into `record`. The record is left untouched on error.
    pub fn apply_to(self, record: &InputRecord) -> Result<InputRecord, CoreError> {
        check_id_unchanged(self.id.as_deref(), &record.id)?;

        let mut merged = record.clone();
        if let Some(kind) = self.kind {
            merged.kind = Some(kind);
        }
        if let Some(source) = self.source {
            merged.source = source;
        }
        if let Some(label) = self.label {
            merged.label = Some(label);
        }
        if let Some(umd) = self.umd {
            merged.umd = Some(umd);
        }

        merged.validate()?;
        Ok(merged)
    }
}

/// Fields to change on an existing output. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputUpdate {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub target: Option<String>,
    pub label: Option<String>,
}

impl OutputUpdate {
    pub fn apply_to(self, record: &OutputRecord) -> Result<OutputRecord, CoreError> {
        check_id_unchanged(self.id.as_deref(), &record.id)?;

        let mut merged = record.clone();
        if let Some(kind) = self.kind {
            merged.kind = Some(kind);
        }
        if let Some(target) = self.target {
            merged.target = target;
        }
        if let Some(label) = self.label {
            merged.label = Some(label);
        }

        merged.validate()?;
        Ok(merged)
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────

/// Whole routing configuration, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(default)]
    pub inputs: Vec<InputRecord>,
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
}

fn require(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn check_id_unchanged(requested: Option<&str>, current: &str) -> Result<(), CoreError> {
    match requested {
        Some(id) if id != current => Err(CoreError::invalid(format!(
            "id cannot be changed (was {current:?}, got {id:?})"
        ))),
        _ => Ok(()),
    }
}
