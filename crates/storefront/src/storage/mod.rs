//! Durable key-value storage for one shopper.
//!
//! This is the storefront's equivalent of browser local storage: string keys
//! mapping to string values, shared by every open "tab" of the same shopper.
//! Writers publish a [`StorageEvent`] after each change so other tabs can
//! re-read what they display.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - In-process map, used by tests and embedded callers
//! - [`SessionStorage`] - One shopper's storage, found through their `tower-sessions` session
//! - [`FileStorage`] - A directory of files, shared by CLI processes

mod file;
mod memory;
mod session;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use session::{SessionStorage, ShopperRegistry};

/// Well-known storage keys.
pub mod keys {
    /// Serialized cart line items (a JSON array).
    pub const CART: &str = "cart";

    /// Cart version stamp, bumped on every cart write.
    pub const CART_VERSION: &str = "cart.version";

    /// Last stored cart blob that failed to decode.
    pub const CART_CORRUPT: &str = "cart.corrupt";

    /// Opaque backend authentication token.
    pub const TOKEN: &str = "token";

    /// Serialized user profile, used to pre-fill checkout.
    pub const USER: &str = "user";
}

/// Errors that can occur when reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session load or save failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The key cannot be stored by this backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// A string key-value store scoped to one shopper.
///
/// Methods return `Send` futures so stores can be used from axum handlers.
pub trait Storage: Send + Sync {
    /// Read a value. Absent keys are `Ok(None)`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete a value. Deleting an absent key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Watch for changes made through any handle on the same storage.
    ///
    /// Backends that cannot observe other writers return `None`.
    fn watch(&self) -> Option<StorageWatcher> {
        None
    }
}

/// Notification that a key changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Which shopper's storage changed.
    pub scope: Arc<str>,
    /// The key that changed, or `None` if changes were missed and every key
    /// should be re-read.
    pub key: Option<String>,
}

/// Fan-out of storage events to every watcher in the process.
#[derive(Debug, Clone)]
pub struct StorageHub {
    tx: broadcast::Sender<StorageEvent>,
}

impl StorageHub {
    const CAPACITY: usize = 256;

    /// Create a hub with no watchers.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(Self::CAPACITY);
        Self { tx }
    }

    /// Announce that `key` changed in `scope`.
    pub fn publish(&self, scope: &Arc<str>, key: &str) {
        // No receivers is normal: nobody is watching this shopper right now.
        let _ = self.tx.send(StorageEvent {
            scope: Arc::clone(scope),
            key: Some(key.to_owned()),
        });
    }

    /// Watch the events of one scope.
    #[must_use]
    pub fn watch(&self, scope: Arc<str>) -> StorageWatcher {
        StorageWatcher {
            scope,
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for StorageHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives the storage events of a single scope.
#[derive(Debug)]
pub struct StorageWatcher {
    scope: Arc<str>,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageWatcher {
    /// Wait for the next change in this watcher's scope.
    ///
    /// Returns `None` once the hub is gone.
    pub async fn changed(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.scope == self.scope => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(missed, scope = %self.scope, "storage watcher lagged");
                    return Some(StorageEvent {
                        scope: Arc::clone(&self.scope),
                        key: None,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
