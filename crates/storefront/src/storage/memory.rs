//! In-process storage.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Storage, StorageError, StorageHub, StorageWatcher};

/// A map held in memory.
///
/// Clones share the same data and the same event stream, so two clones behave
/// like two browser tabs over one storage.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    values: Arc<RwLock<HashMap<String, String>>>,
    hub: StorageHub,
    scope: Arc<str>,
}

impl MemoryStorage {
    /// Create an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::scoped(StorageHub::new(), Arc::from(Uuid::new_v4().to_string()))
    }

    /// Create an empty storage that publishes its changes to `hub` under
    /// `scope`.
    #[must_use]
    pub fn scoped(hub: StorageHub, scope: Arc<str>) -> Self {
        Self {
            values: Arc::default(),
            hub,
            scope,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        self.hub.publish(&self.scope, key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.values.write().await.remove(key);
        if removed.is_some() {
            self.hub.publish(&self.scope, key);
        }
        Ok(())
    }

    fn watch(&self) -> Option<StorageWatcher> {
        Some(self.hub.watch(Arc::clone(&self.scope)))
    }
}
