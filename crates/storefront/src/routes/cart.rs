//! Cart route handlers.
//!
//! The cart lives in the shopper's session storage. Every mutating route
//! returns the full cart view so the client can re-render from one response.
//! Lines are addressed by `line` (stable key) or `index` (position); passing
//! `version` makes the change fail with 409 if another tab changed the cart
//! first.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use soko_core::{CartLineItem, LineKey, LineRef, Price, ProductId};
use tracing::instrument;

use crate::cart::CartSnapshot;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::ShopperStorage;
use crate::state::AppState;
use crate::storage::{Storage, keys};

/// One cart line as shown to the shopper.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub key: LineKey,
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub price_display: String,
    pub quantity: u32,
    pub line_total: Price,
    pub line_total_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<&CartLineItem> for CartLineView {
    fn from(line: &CartLineItem) -> Self {
        let line_total = line.line_total();
        Self {
            key: line.key,
            id: line.id.clone(),
            name: line.name.clone(),
            price: line.price,
            price_display: line.price.display(),
            quantity: line.quantity.get(),
            line_total,
            line_total_display: line_total.display(),
            image: line.image.clone(),
            category: line.category.clone(),
        }
    }
}

/// The cart as returned by every cart route.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub version: u64,
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub line_count: usize,
    pub total: Price,
    pub total_display: String,
    /// Set when the stored cart had to be repaired on load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

impl From<&CartSnapshot> for CartView {
    fn from(snapshot: &CartSnapshot) -> Self {
        let total = snapshot.total();
        Self {
            version: snapshot.version,
            lines: snapshot.items().iter().map(CartLineView::from).collect(),
            item_count: snapshot.item_count(),
            line_count: snapshot.line_count(),
            total,
            total_display: total.display(),
            notice: snapshot.issue.map(|issue| issue.message()),
        }
    }
}

/// Badge counts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCount {
    /// Number of distinct lines, as shown on the navigation badge.
    pub count: usize,
    /// Total units across all lines.
    pub items: u64,
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
}

/// Reference to a line: `line` (key) wins over `index`.
#[derive(Debug, Deserialize)]
pub struct LineSelector {
    pub line: Option<LineKey>,
    pub index: Option<usize>,
}

impl LineSelector {
    fn resolve(&self) -> Result<LineRef> {
        match (self.line, self.index) {
            (Some(key), _) => Ok(LineRef::Key(key)),
            (None, Some(index)) => Ok(LineRef::Index(index)),
            (None, None) => Err(AppError::BadRequest(
                "either `line` or `index` is required".to_string(),
            )),
        }
    }
}

/// Update cart line request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    #[serde(flatten)]
    pub selector: LineSelector,
    pub quantity: i64,
    pub version: Option<u64>,
}

/// Remove cart line request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    #[serde(flatten)]
    pub selector: LineSelector,
    pub version: Option<u64>,
}

/// Display cart.
#[instrument(skip_all)]
pub async fn show(ShopperStorage(storage): ShopperStorage) -> Result<Json<CartView>> {
    let snapshot = storage.into_cart().load().await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Add a catalog product to the cart.
#[instrument(skip(state, storage))]
pub async fn add(
    State(state): State<AppState>,
    ShopperStorage(storage): ShopperStorage,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let product = state
        .backend()
        .product(&request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;

    let snapshot = storage.into_cart().add_item(&product).await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[("product_id", &product.id.to_string())],
    );
    Ok(Json(CartView::from(&snapshot)))
}

/// Change a line's quantity. Quantities below one are ignored.
#[instrument(skip(storage))]
pub async fn update(
    ShopperStorage(storage): ShopperStorage,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let line = request.selector.resolve()?;
    let snapshot = storage
        .into_cart()
        .update_quantity(line, request.quantity, request.version)
        .await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Remove a line.
#[instrument(skip(storage))]
pub async fn remove(
    ShopperStorage(storage): ShopperStorage,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let line = request.selector.resolve()?;
    let snapshot = storage
        .into_cart()
        .remove_item(line, request.version)
        .await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Empty the cart.
#[instrument(skip_all)]
pub async fn clear(ShopperStorage(storage): ShopperStorage) -> Result<Json<CartView>> {
    let store = storage.into_cart();
    store.clear().await?;
    let snapshot = store.load().await?;
    Ok(Json(CartView::from(&snapshot)))
}

/// Cart badge counts.
#[instrument(skip_all)]
pub async fn count(ShopperStorage(storage): ShopperStorage) -> Result<Json<CartCount>> {
    let snapshot = storage.into_cart().load().await?;
    Ok(Json(CartCount {
        count: snapshot.line_count(),
        items: snapshot.item_count(),
    }))
}

/// Stream cart change notifications for this shopper.
///
/// Sends a `cart` event whenever any tab of the same session changes the
/// cart. The event carries no cart data; clients re-fetch `GET /cart`.
pub async fn events(
    ShopperStorage(storage): ShopperStorage,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let mut watcher = storage
        .watch()
        .ok_or_else(|| AppError::Internal("session storage cannot be watched".to_string()))?;

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ready").data("{}"));
        while let Some(change) = watcher.changed().await {
            let resync = change.key.is_none();
            // The version key is written last by every cart change.
            if resync || change.key.as_deref() == Some(keys::CART_VERSION) {
                let data = serde_json::json!({ "resync": resync }).to_string();
                yield Ok(Event::default().event("cart").data(data));
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
