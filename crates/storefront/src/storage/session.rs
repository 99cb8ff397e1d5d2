//! Per-shopper storage located through the HTTP session.
//!
//! The session only carries the shopper's scope id. Values live in a
//! [`ShopperRegistry`] shared by the whole server, so every request with the
//! same session cookie reads and writes the same map, a write is visible to
//! other requests as soon as it returns, and cart changes from concurrent
//! requests are serialized by one lock per shopper.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::Session;
use uuid::Uuid;

use super::{MemoryStorage, Storage, StorageError, StorageHub, StorageWatcher};
use crate::cart::CartStore;

/// Session key holding the shopper's storage scope id.
pub const SCOPE_KEY: &str = "storage_scope";

#[derive(Debug, Clone)]
struct Shopper {
    storage: MemoryStorage,
    cart_lock: Arc<Mutex<()>>,
}

/// Storage of every active shopper, keyed by scope id.
///
/// Shoppers idle for longer than the configured timeout are forgotten.
#[derive(Debug, Clone)]
pub struct ShopperRegistry {
    shoppers: Cache<Arc<str>, Shopper>,
    hub: StorageHub,
}

impl ShopperRegistry {
    /// Create an empty registry that drops shoppers idle for `idle_timeout`.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            shoppers: Cache::builder().time_to_idle(idle_timeout).build(),
            hub: StorageHub::new(),
        }
    }

    async fn shopper(&self, scope: &Arc<str>) -> Shopper {
        self.shoppers
            .get_with(Arc::clone(scope), async {
                Shopper {
                    storage: MemoryStorage::scoped(self.hub.clone(), Arc::clone(scope)),
                    cart_lock: Arc::default(),
                }
            })
            .await
    }
}

/// One shopper's storage, found through their session.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    scope: Arc<str>,
    storage: MemoryStorage,
    cart_lock: Arc<Mutex<()>>,
}

impl SessionStorage {
    /// Open storage for `session`, assigning it a scope on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn open(session: &Session, shoppers: &ShopperRegistry) -> Result<Self, StorageError> {
        let scope = if let Some(scope) = session.get::<String>(SCOPE_KEY).await? {
            scope
        } else {
            let scope = Uuid::new_v4().to_string();
            session.insert(SCOPE_KEY, &scope).await?;
            scope
        };
        let scope: Arc<str> = Arc::from(scope);
        let shopper = shoppers.shopper(&scope).await;

        Ok(Self {
            scope,
            storage: shopper.storage,
            cart_lock: shopper.cart_lock,
        })
    }

    /// This shopper's scope id.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The shopper's cart. Operations are serialized with every other
    /// request of the same shopper.
    #[must_use]
    pub fn into_cart(self) -> CartStore<Self> {
        let lock = Arc::clone(&self.cart_lock);
        CartStore::with_lock(self, lock)
    }
}

impl Storage for SessionStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove(key).await
    }

    fn watch(&self) -> Option<StorageWatcher> {
        self.storage.watch()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use soko_core::{LineRef, Product};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::cart::CartError;
    use crate::storage::keys;

    const IDLE: Duration = Duration::from_secs(60);

    /// Two request-local handles on the same saved session, like two
    /// overlapping requests carrying one cookie.
    async fn same_cookie_sessions() -> (Session, Session) {
        let store = Arc::new(MemoryStore::default());
        let first = Session::new(None, Arc::clone(&store), None);
        first.insert("seen", true).await.unwrap();
        first.save().await.unwrap();
        let second = Session::new(first.id(), store, None);
        (first, second)
    }

    fn product(id: i64, price: u32) -> Product {
        serde_json::from_value(json!({"id": id, "name": "Item", "price": price})).unwrap()
    }

    #[tokio::test]
    async fn test_scope_is_stable_for_a_session() {
        let shoppers = ShopperRegistry::new(IDLE);
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        let first = SessionStorage::open(&session, &shoppers).await.unwrap();
        let second = SessionStorage::open(&session, &shoppers).await.unwrap();
        assert_eq!(first.scope(), second.scope());
    }

    #[tokio::test]
    async fn test_values_shared_by_requests_with_same_cookie() {
        let shoppers = ShopperRegistry::new(IDLE);
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(None, Arc::clone(&store), None);
        let first = SessionStorage::open(&session, &shoppers).await.unwrap();
        session.save().await.unwrap();

        first.set(keys::TOKEN, "abc").await.unwrap();
        assert_eq!(session.get::<String>(keys::TOKEN).await.unwrap(), None);

        let later = Session::new(session.id(), store, None);
        let second = SessionStorage::open(&later, &shoppers).await.unwrap();
        assert_eq!(second.scope(), first.scope());
        assert_eq!(
            second.get(keys::TOKEN).await.unwrap().as_deref(),
            Some("abc")
        );

        second.remove(keys::TOKEN).await.unwrap();
        assert_eq!(first.get(keys::TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writes_notify_same_scope_only() {
        let shoppers = ShopperRegistry::new(IDLE);
        let store = Arc::new(MemoryStore::default());
        let mine = SessionStorage::open(&Session::new(None, Arc::clone(&store), None), &shoppers)
            .await
            .unwrap();
        let theirs = SessionStorage::open(&Session::new(None, store, None), &shoppers)
            .await
            .unwrap();
        let mut watcher = mine.watch().unwrap();

        theirs.set(keys::CART, "[]").await.unwrap();
        mine.set(keys::CART_VERSION, "1").await.unwrap();

        let event = watcher.changed().await.unwrap();
        assert_eq!(event.key.as_deref(), Some(keys::CART_VERSION));
    }

    #[tokio::test]
    async fn test_change_visible_when_event_arrives() {
        let shoppers = ShopperRegistry::new(IDLE);
        let (writer_session, reader_session) = same_cookie_sessions().await;
        let writer = SessionStorage::open(&writer_session, &shoppers).await.unwrap();
        writer_session.save().await.unwrap();
        let mut watcher = writer.watch().unwrap();

        writer.into_cart().add_item(&product(1, 1000)).await.unwrap();
        let event = watcher.changed().await.unwrap();
        assert_eq!(event.key.as_deref(), Some(keys::CART));

        reader_session.load().await.unwrap();
        let reader = SessionStorage::open(&reader_session, &shoppers).await.unwrap();
        let snapshot = reader.into_cart().load().await.unwrap();
        assert_eq!(snapshot.line_count(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_conditional_updates() {
        let shoppers = ShopperRegistry::new(IDLE);
        let (first_session, second_session) = same_cookie_sessions().await;
        let first = SessionStorage::open(&first_session, &shoppers).await.unwrap();
        first_session.save().await.unwrap();
        second_session.load().await.unwrap();
        let second = SessionStorage::open(&second_session, &shoppers).await.unwrap();

        let setup = first.clone().into_cart();
        setup.add_item(&product(1, 1000)).await.unwrap();
        let seen = setup.add_item(&product(2, 300)).await.unwrap();

        let update = first.into_cart();
        let remove = second.into_cart();
        let (updated, removed) = tokio::join!(
            update.update_quantity(LineRef::Index(0), 5, Some(seen.version)),
            remove.remove_item(LineRef::Index(1), Some(seen.version)),
        );

        // Exactly one of the two wins; the other sees the new version.
        let conflicts = [updated.is_err(), removed.is_err()]
            .iter()
            .filter(|failed| **failed)
            .count();
        assert_eq!(conflicts, 1);
        for result in [&updated, &removed] {
            if let Err(err) = result {
                assert!(matches!(err, CartError::VersionConflict { .. }));
            }
        }

        let stored = setup.load().await.unwrap();
        assert_eq!(stored.version, seen.version + 1);
        if updated.is_ok() {
            assert_eq!(stored.line_count(), 2);
            assert_eq!(stored.items()[0].quantity.get(), 5);
        } else {
            assert_eq!(stored.line_count(), 1);
            assert_eq!(stored.items()[0].quantity.get(), 1);
        }
    }
}
