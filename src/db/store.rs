use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Keys for per-session snapshots
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Location(String),
    Preferences(String),
    Itinerary(String),
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::Location(session) => write!(f, "session:{}:location", session),
            StoreKey::Preferences(session) => write!(f, "session:{}:preferences", session),
            StoreKey::Itinerary(session) => write!(f, "session:{}:itinerary", session),
        }
    }
}

/// Key-value storage for JSON snapshots
///
/// Read when a session starts and written at checkpoints: location selection,
/// preference save and itinerary changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get_raw(&self, key: &StoreKey) -> AppResult<Option<String>>;

    async fn set_raw(&self, key: &StoreKey, value: String) -> AppResult<()>;

    fn name(&self) -> &'static str;
}

/// Reads and decodes a snapshot
///
/// A snapshot that no longer decodes is logged and treated as absent.
pub async fn load<T: DeserializeOwned>(
    store: &dyn PersistentStore,
    key: &StoreKey,
) -> AppResult<Option<T>> {
    let Some(json) = store.get_raw(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str(&json) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Ignoring unreadable stored snapshot");
            Ok(None)
        }
    }
}

pub async fn save<T: Serialize + ?Sized>(
    store: &dyn PersistentStore,
    key: &StoreKey,
    value: &T,
) -> AppResult<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Snapshot serialization error: {}", e)))?;
    store.set_raw(key, json).await
}

/// Process-local store, used when no Redis URL is configured
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl PersistentStore for MemoryStore {
    async fn get_raw(&self, key: &StoreKey) -> AppResult<Option<String>> {
        Ok(self.entries.read().await.get(&key.to_string()).cloned())
    }

    async fn set_raw(&self, key: &StoreKey, value: String) -> AppResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
