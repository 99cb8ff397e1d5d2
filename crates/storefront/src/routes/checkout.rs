//! Checkout route handlers.

use axum::{Json, extract::State};
use serde::Serialize;
use soko_core::{BuyerDetails, Price};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::ShopperStorage;
use crate::routes::cart::CartView;
use crate::services::{Receipt, account, checkout};
use crate::state::AppState;

/// Checkout page data.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub buyer: BuyerDetails,
    pub cart: CartView,
    pub logged_in: bool,
}

/// Accepted order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPlaced {
    pub message: &'static str,
    pub total: Price,
    pub total_display: String,
    pub item_count: u64,
    pub placed_at: chrono::DateTime<chrono::Utc>,
    pub confirmation: serde_json::Value,
}

impl From<Receipt> for OrderPlaced {
    fn from(receipt: Receipt) -> Self {
        Self {
            message: receipt.message,
            total: receipt.total,
            total_display: receipt.total.display(),
            item_count: receipt.item_count,
            placed_at: receipt.placed_at,
            confirmation: receipt.confirmation,
        }
    }
}

/// Buyer details pre-filled from the profile, plus the cart summary.
#[instrument(skip_all)]
pub async fn show(ShopperStorage(storage): ShopperStorage) -> Result<Json<CheckoutView>> {
    let buyer = checkout::prefill(&storage).await?;
    let logged_in = account::is_logged_in(&storage).await?;
    let snapshot = storage.into_cart().load().await?;

    Ok(Json(CheckoutView {
        buyer,
        cart: CartView::from(&snapshot),
        logged_in,
    }))
}

/// Place the order for the whole cart.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    ShopperStorage(storage): ShopperStorage,
    Json(details): Json<BuyerDetails>,
) -> Result<Json<OrderPlaced>> {
    let store = storage.into_cart();
    let receipt = checkout::submit(&store, state.backend(), &details).await?;
    add_breadcrumb("checkout", "Order placed", &[]);
    Ok(Json(OrderPlaced::from(receipt)))
}
