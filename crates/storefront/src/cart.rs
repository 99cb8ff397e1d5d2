//! The persisted shopping cart.
//!
//! [`CartStore`] owns the `"cart"` key of a [`Storage`]. Every mutation
//! reloads the stored cart, applies the change, and writes the whole list back
//! together with a bumped version stamp. Callers that pass the version they
//! last saw get [`CartError::VersionConflict`] instead of silently editing a
//! cart that another tab changed underneath them.

use std::sync::Arc;

use soko_core::{
    Cart, CartCodecError, CartLineItem, LineKey, LineRef, Price, Product, Quantity, decode_cart,
    encode_cart,
};
use tokio::sync::Mutex;
use tracing::instrument;

use crate::storage::{Storage, StorageError, keys};

/// Errors that can occur during cart operations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// Reading or writing storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The cart could not be serialized.
    #[error(transparent)]
    Encode(#[from] CartCodecError),

    /// The referenced line is not in the stored cart.
    #[error("cart line not found")]
    LineNotFound,

    /// The stored cart changed since the caller last read it.
    #[error("cart was modified (expected version {expected}, found {actual})")]
    VersionConflict { expected: u64, actual: u64 },
}

/// Something wrong with the stored cart that [`CartStore::load`] recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartLoadIssue {
    /// The stored value was not a JSON list. It was moved to `"cart.corrupt"`
    /// and the cart reads as empty.
    Corrupt,
    /// This many list entries were unusable and skipped.
    DroppedEntries(usize),
}

impl CartLoadIssue {
    /// Short message suitable for showing to the shopper.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Corrupt => "Your saved cart could not be read and was reset.",
            Self::DroppedEntries(_) => "Some items in your saved cart could not be read.",
        }
    }
}

/// The cart as stored at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub version: u64,
    pub cart: Cart,
    pub issue: Option<CartLoadIssue>,
}

impl CartSnapshot {
    /// The line items, in order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        self.cart.lines()
    }

    /// Sum of `price × quantity` over every line.
    #[must_use]
    pub fn total(&self) -> Price {
        self.cart.total()
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart.item_count()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.cart.len()
    }

    /// Find a line by key.
    #[must_use]
    pub fn line(&self, key: LineKey) -> Option<&CartLineItem> {
        self.cart.get(LineRef::Key(key))
    }
}

/// Cart operations over a storage backend.
///
/// Operations on one store, and on stores sharing its lock, are serialized,
/// so each is an atomic read-modify-write within this process. Stores with
/// separate locks over the same storage (another process) are not
/// coordinated; the version stamp lets callers detect that.
#[derive(Debug, Clone)]
pub struct CartStore<S> {
    storage: S,
    lock: Arc<Mutex<()>>,
}

impl<S: Storage> CartStore<S> {
    /// Create a store over `storage`.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self::with_lock(storage, Arc::default())
    }

    /// Create a store that serializes its operations with every other store
    /// holding the same `lock`.
    #[must_use]
    pub const fn with_lock(storage: S, lock: Arc<Mutex<()>>) -> Self {
        Self { storage, lock }
    }

    /// The underlying storage.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Read the stored cart.
    ///
    /// Bad data never fails the call: a corrupt blob reads as an empty cart
    /// with [`CartLoadIssue::Corrupt`]. Lines stored without a key get one,
    /// and the cart is written back so the keys stay stable.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage itself fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<CartSnapshot, CartError> {
        let _guard = self.lock.lock().await;
        let (snapshot, assigned_keys) = self.read().await?;
        if assigned_keys {
            let issue = snapshot.issue;
            let mut written = self.write(snapshot.cart, snapshot.version).await?;
            written.issue = issue;
            return Ok(written);
        }
        Ok(snapshot)
    }

    /// Add one unit of `product`.
    ///
    /// Increments the first line with the same product id, or appends a new
    /// line with quantity one.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_item(&self, product: &Product) -> Result<CartSnapshot, CartError> {
        let _guard = self.lock.lock().await;
        let (mut snapshot, _) = self.read().await?;
        let key = snapshot.cart.add_product(product);
        tracing::debug!(%key, "added product to cart");
        self.write(snapshot.cart, snapshot.version).await
    }

    /// Set the quantity of a line.
    ///
    /// A quantity below one is ignored: nothing is written and the current
    /// cart is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::VersionConflict`] if `expected_version` is given
    /// and stale, [`CartError::LineNotFound`] if the line does not exist, or a
    /// storage error.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        line: LineRef,
        quantity: i64,
        expected_version: Option<u64>,
    ) -> Result<CartSnapshot, CartError> {
        let _guard = self.lock.lock().await;
        let (mut snapshot, _) = self.read().await?;

        let Some(quantity) = Quantity::from_requested(quantity) else {
            tracing::debug!("ignoring quantity below one");
            return Ok(snapshot);
        };

        check_version(expected_version, snapshot.version)?;
        if !snapshot.cart.set_quantity(line, quantity) {
            return Err(CartError::LineNotFound);
        }
        self.write(snapshot.cart, snapshot.version).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::VersionConflict`] if `expected_version` is given
    /// and stale, [`CartError::LineNotFound`] if the line does not exist, or a
    /// storage error.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        line: LineRef,
        expected_version: Option<u64>,
    ) -> Result<CartSnapshot, CartError> {
        let _guard = self.lock.lock().await;
        let (mut snapshot, _) = self.read().await?;
        check_version(expected_version, snapshot.version)?;
        if snapshot.cart.remove(line).is_none() {
            return Err(CartError::LineNotFound);
        }
        self.write(snapshot.cart, snapshot.version).await
    }

    /// Delete the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        let _guard = self.lock.lock().await;
        let version = self.read_version().await?;
        self.storage.remove(keys::CART).await?;
        self.storage
            .set(keys::CART_VERSION, &version.saturating_add(1).to_string())
            .await?;
        Ok(())
    }

    /// Sum of `price × quantity` over `items`. Zero for an empty slice.
    #[must_use]
    pub fn calculate_total(items: &[CartLineItem]) -> Price {
        soko_core::calculate_total(items)
    }

    async fn read_version(&self) -> Result<u64, CartError> {
        let raw = self.storage.get(keys::CART_VERSION).await?;
        Ok(raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0))
    }

    /// Load without locking. Also reports whether keys had to be assigned.
    async fn read(&self) -> Result<(CartSnapshot, bool), CartError> {
        let version = self.read_version().await?;
        let Some(raw) = self.storage.get(keys::CART).await? else {
            return Ok((
                CartSnapshot {
                    version,
                    cart: Cart::new(),
                    issue: None,
                },
                false,
            ));
        };

        match decode_cart(&raw) {
            Ok(decoded) => {
                let issue = if decoded.dropped > 0 {
                    tracing::warn!(dropped = decoded.dropped, "skipped unreadable cart entries");
                    self.quarantine(&raw).await?;
                    Some(CartLoadIssue::DroppedEntries(decoded.dropped))
                } else {
                    None
                };
                Ok((
                    CartSnapshot {
                        version,
                        cart: decoded.cart,
                        issue,
                    },
                    decoded.assigned_keys,
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored cart is corrupt, resetting");
                self.quarantine(&raw).await?;
                Ok((
                    CartSnapshot {
                        version,
                        cart: Cart::new(),
                        issue: Some(CartLoadIssue::Corrupt),
                    },
                    false,
                ))
            }
        }
    }

    async fn quarantine(&self, raw: &str) -> Result<(), CartError> {
        let existing = self.storage.get(keys::CART_CORRUPT).await?;
        if existing.as_deref() != Some(raw) {
            self.storage.set(keys::CART_CORRUPT, raw).await?;
        }
        Ok(())
    }

    async fn write(&self, cart: Cart, version: u64) -> Result<CartSnapshot, CartError> {
        let encoded = encode_cart(&cart)?;
        let version = version.saturating_add(1);
        self.storage.set(keys::CART, &encoded).await?;
        self.storage
            .set(keys::CART_VERSION, &version.to_string())
            .await?;
        Ok(CartSnapshot {
            version,
            cart,
            issue: None,
        })
    }
}

fn check_version(expected: Option<u64>, actual: u64) -> Result<(), CartError> {
    match expected {
        Some(expected) if expected != actual => Err(CartError::VersionConflict { expected, actual }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: i64, name: &str, price: u32) -> Product {
        serde_json::from_value(json!({"id": id, "name": name, "price": price})).unwrap()
    }

    fn store() -> CartStore<MemoryStorage> {
        CartStore::new(MemoryStorage::new())
    }

    async fn stored_json(store: &CartStore<MemoryStorage>) -> serde_json::Value {
        let raw = store.storage().get(keys::CART).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_empty_when_nothing_stored() {
        let snapshot = store().load().await.unwrap();
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.items().is_empty());
        assert_eq!(snapshot.issue, None);
    }

    #[tokio::test]
    async fn test_add_first_item() {
        let store = store();
        let snapshot = store.add_item(&product(1, "Phone", 1000)).await.unwrap();

        assert_eq!(snapshot.line_count(), 1);
        let stored = stored_json(&store).await;
        let line = &stored[0];
        assert_eq!(line["id"], 1);
        assert_eq!(line["name"], "Phone");
        assert_eq!(line["price"], 1000);
        assert_eq!(line["quantity"], 1);
        assert!(line["key"].is_string());
    }

    #[tokio::test]
    async fn test_add_existing_increments_by_one() {
        let store = store();
        let phone = product(1, "Phone", 1000);
        store.add_item(&phone).await.unwrap();
        store.add_item(&product(2, "Case", 200)).await.unwrap();
        let snapshot = store.add_item(&phone).await.unwrap();

        assert_eq!(snapshot.line_count(), 2);
        assert_eq!(snapshot.items()[0].quantity.get(), 2);
        assert_eq!(snapshot.items()[1].quantity.get(), 1);
        assert_eq!(snapshot.item_count(), 3);
    }

    #[tokio::test]
    async fn test_update_quantity_by_index_and_ignore_below_one() {
        let store = store();
        store
            .storage()
            .set(keys::CART, r#"[{"id":1,"price":1000,"quantity":2}]"#)
            .await
            .unwrap();

        let snapshot = store
            .update_quantity(LineRef::Index(0), 1, None)
            .await
            .unwrap();
        assert_eq!(snapshot.items()[0].quantity.get(), 1);

        let before = store.storage().get(keys::CART).await.unwrap();
        let unchanged = store
            .update_quantity(LineRef::Index(0), 0, None)
            .await
            .unwrap();
        assert_eq!(unchanged.items()[0].quantity.get(), 1);
        assert_eq!(unchanged.version, snapshot.version);
        assert_eq!(store.storage().get(keys::CART).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_huge_quantity_saturates() {
        let store = store();
        store.add_item(&product(1, "Phone", 1000)).await.unwrap();

        let snapshot = store
            .update_quantity(LineRef::Index(0), 5_000_000_000, None)
            .await
            .unwrap();
        assert_eq!(snapshot.items()[0].quantity.get(), u32::MAX);
        assert_eq!(snapshot.version, 2);
    }

    #[tokio::test]
    async fn test_update_by_key_survives_reorder() {
        let store = store();
        store.add_item(&product(1, "Phone", 1000)).await.unwrap();
        let snapshot = store.add_item(&product(2, "Case", 200)).await.unwrap();
        let case_key = snapshot.items()[1].key;

        // Another tab removes the first line; the key still points at the case.
        store.remove_item(LineRef::Index(0), None).await.unwrap();
        let snapshot = store
            .update_quantity(LineRef::Key(case_key), 5, None)
            .await
            .unwrap();

        assert_eq!(snapshot.line(case_key).unwrap().quantity.get(), 5);
        assert_eq!(snapshot.line(case_key).unwrap().name, "Case");
    }

    #[tokio::test]
    async fn test_unknown_line_is_not_found() {
        let store = store();
        store.add_item(&product(1, "Phone", 1000)).await.unwrap();

        assert!(matches!(
            store.update_quantity(LineRef::Index(3), 2, None).await,
            Err(CartError::LineNotFound)
        ));
        assert!(matches!(
            store
                .remove_item(LineRef::Key(LineKey::generate()), None)
                .await,
            Err(CartError::LineNotFound)
        ));
    }

    #[tokio::test]
    async fn test_stale_version_writes_nothing() {
        let store = store();
        let first = store.add_item(&product(1, "Phone", 1000)).await.unwrap();
        let key = first.items()[0].key;
        store.add_item(&product(2, "Case", 200)).await.unwrap();
        let before = store.storage().get(keys::CART).await.unwrap();

        let err = store
            .remove_item(LineRef::Key(key), Some(first.version))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CartError::VersionConflict { expected: 1, actual: 2 }
        ));
        assert_eq!(store.storage().get(keys::CART).await.unwrap(), before);

        let current = store.load().await.unwrap();
        let snapshot = store
            .remove_item(LineRef::Key(key), Some(current.version))
            .await
            .unwrap();
        assert_eq!(snapshot.line_count(), 1);
    }

    #[tokio::test]
    async fn test_mutation_uses_freshest_stored_cart() {
        let storage = MemoryStorage::new();
        let tab_a = CartStore::new(storage.clone());
        let tab_b = CartStore::new(storage);

        tab_a.add_item(&product(1, "Phone", 1000)).await.unwrap();
        tab_b.add_item(&product(2, "Case", 200)).await.unwrap();
        let snapshot = tab_a.add_item(&product(3, "Charger", 800)).await.unwrap();

        assert_eq!(snapshot.line_count(), 3);
    }

    #[tokio::test]
    async fn test_total_scenario() {
        let store = store();
        store
            .storage()
            .set(
                keys::CART,
                r#"[{"id":1,"price":500,"quantity":2},{"id":2,"price":300,"quantity":1}]"#,
            )
            .await
            .unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.total(), Price::from_shillings(1300));
        assert_eq!(snapshot.total().display(), "Ksh 1,300");
        assert_eq!(
            CartStore::<MemoryStorage>::calculate_total(snapshot.items()),
            Price::from_shillings(1300)
        );
        assert_eq!(
            CartStore::<MemoryStorage>::calculate_total(&[]),
            Price::ZERO
        );
    }

    #[tokio::test]
    async fn test_corrupt_cart_is_quarantined() {
        let store = store();
        store
            .storage()
            .set(keys::CART, r#"{"not": "a list"}"#)
            .await
            .unwrap();

        let snapshot = store.load().await.unwrap();
        assert!(snapshot.items().is_empty());
        assert_eq!(snapshot.issue, Some(CartLoadIssue::Corrupt));
        assert_eq!(
            store
                .storage()
                .get(keys::CART_CORRUPT)
                .await
                .unwrap()
                .as_deref(),
            Some(r#"{"not": "a list"}"#)
        );

        let snapshot = store.add_item(&product(1, "Phone", 1000)).await.unwrap();
        assert_eq!(snapshot.issue, None);
        assert_eq!(stored_json(&store).await[0]["id"], 1);
    }

    #[tokio::test]
    async fn test_dropped_entries_reported() {
        let store = store();
        let raw = r#"[{"id":1,"price":100,"key":"00000000-0000-4000-8000-000000000001"}, 7, {"name":"no id"}]"#;
        store.storage().set(keys::CART, raw).await.unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.line_count(), 1);
        assert_eq!(snapshot.issue, Some(CartLoadIssue::DroppedEntries(2)));

        // The next write drops the unreadable entries from "cart", but the
        // original text is kept.
        store.add_item(&product(2, "Case", 200)).await.unwrap();
        assert_eq!(
            store.storage().get(keys::CART_CORRUPT).await.unwrap().as_deref(),
            Some(raw)
        );
    }

    #[tokio::test]
    async fn test_legacy_lines_get_stable_keys() {
        let store = store();
        store
            .storage()
            .set(keys::CART, r#"[{"id":1,"name":"Phone","price":1000,"quantity":2}]"#)
            .await
            .unwrap();

        let first = store.load().await.unwrap();
        let second = store.load().await.unwrap();
        assert_eq!(first.items()[0].key, second.items()[0].key);
        assert_eq!(first.version, second.version);
    }

    #[tokio::test]
    async fn test_clear_removes_blob_and_bumps_version() {
        let store = store();
        let snapshot = store.add_item(&product(1, "Phone", 1000)).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.storage().get(keys::CART).await.unwrap(), None);
        let cleared = store.load().await.unwrap();
        assert!(cleared.items().is_empty());
        assert!(cleared.version > snapshot.version);
    }

    #[tokio::test]
    async fn test_writes_notify_watchers() {
        let store = store();
        let mut watcher = store.storage().watch().unwrap();
        store.add_item(&product(1, "Phone", 1000)).await.unwrap();

        let event = watcher.changed().await.unwrap();
        assert_eq!(event.key.as_deref(), Some(keys::CART));
    }
}
