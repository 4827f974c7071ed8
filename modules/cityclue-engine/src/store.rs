//! Persisted-state stores.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::codec::PersistedState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No saved state with id {0}")]
    NotFound(String),

    #[error("Invalid state id: {0:?}")]
    InvalidId(String),

    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key/value store for shared sessions. `save` hands back an opaque id that
/// `load` accepts.
pub trait StateStore {
    fn save(&self, state: &PersistedState) -> Result<String, StoreError>;
    fn load(&self, id: &str) -> Result<PersistedState, StoreError>;
}

/// One saved blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// MemoryStateStore (CLI and tests)
// ---------------------------------------------------------------------------

/// In-memory store. Saving a blob identical to one already stored returns
/// the existing id. Thread-safe.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: Mutex<HashMap<String, StoredState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry, oldest first.
    pub fn entries(&self) -> Vec<StoredState> {
        let mut entries: Vec<_> = self.entries.lock().unwrap().values().cloned().collect();
        entries.sort_by_key(|e| e.saved_at);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn save(&self, state: &PersistedState) -> Result<String, StoreError> {
        let data = serde_json::to_value(state)?;
        let mut entries = self.entries.lock().unwrap();

        if let Some(existing) = entries.values().find(|e| e.data == data) {
            debug!(id = %existing.id, "Identical state already stored");
            return Ok(existing.id.clone());
        }

        let mut id = Uuid::new_v4().to_string();
        while entries.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        entries.insert(
            id.clone(),
            StoredState {
                id: id.clone(),
                saved_at: Utc::now(),
                data,
            },
        );
        debug!(id = %id, "Stored state");
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<PersistedState, StoreError> {
        if Uuid::parse_str(id).is_err() {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        let entries = self.entries.lock().unwrap();
        let entry = entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(serde_json::from_value(entry.data.clone())?)
    }
}

// ---------------------------------------------------------------------------
// Arc<S> blanket: lets callers share one store
// ---------------------------------------------------------------------------

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn save(&self, state: &PersistedState) -> Result<String, StoreError> {
        (**self).save(state)
    }

    fn load(&self, id: &str) -> Result<PersistedState, StoreError> {
        (**self).load(id)
    }
}
