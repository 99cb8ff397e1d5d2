//! Checkout: buyer details, order submission, and receipt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use soko_core::{BuyerDetails, BuyerErrors, CheckoutRequest, Price};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, BackendClient};
use crate::cart::{CartError, CartStore};
use crate::storage::{Storage, StorageError, keys};

use super::account;

/// Shown when the backend rejects an order without saying why.
pub const CHECKOUT_FAILED_MESSAGE: &str = "Checkout failed. Please try again";

/// Shown after the order is accepted.
pub const PAYMENT_REQUESTED_MESSAGE: &str = "M-Pesa payment request sent! Check your phone";

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more buyer fields are invalid. Nothing was sent.
    #[error("invalid buyer details: {0}")]
    Invalid(BuyerErrors),

    /// No auth token is stored; the shopper must log in first.
    #[error("login required")]
    LoginRequired,

    /// The cart has no lines.
    #[error("your cart is empty")]
    EmptyCart,

    /// The backend did not accept the order. The cart is unchanged.
    #[error("order submission failed: {0}")]
    Backend(#[from] ApiError),

    /// Reading the cart failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Reading the token failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CheckoutError {
    /// Message to show the shopper for a backend failure.
    #[must_use]
    pub fn backend_message(&self) -> &str {
        match self {
            Self::Backend(err) => err.backend_message().unwrap_or(CHECKOUT_FAILED_MESSAGE),
            _ => CHECKOUT_FAILED_MESSAGE,
        }
    }
}

/// Outcome of an accepted order.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub total: Price,
    pub item_count: u64,
    pub line_count: usize,
    pub message: &'static str,
    pub placed_at: DateTime<Utc>,
    /// Whatever the backend returned for the order.
    pub confirmation: Value,
}

/// Buyer details pre-filled from the stored user profile.
///
/// A missing or unreadable profile gives empty fields.
///
/// # Errors
///
/// Returns an error only if storage fails.
pub async fn prefill<S: Storage>(storage: &S) -> Result<BuyerDetails, StorageError> {
    let Some(raw) = storage.get(keys::USER).await? else {
        return Ok(BuyerDetails::default());
    };
    match serde_json::from_str::<Map<String, Value>>(&raw) {
        Ok(profile) => Ok(BuyerDetails::from_profile(&profile)),
        Err(e) => {
            tracing::warn!(error = %e, "stored user profile is unreadable");
            Ok(BuyerDetails::default())
        }
    }
}

/// Validate the buyer, then place one order for the whole cart.
///
/// Checks run in order: buyer details, login, non-empty cart. The cart is
/// cleared only once the backend accepts the order.
///
/// # Errors
///
/// Returns [`CheckoutError::Invalid`], [`CheckoutError::LoginRequired`] or
/// [`CheckoutError::EmptyCart`] before anything is sent, and
/// [`CheckoutError::Backend`] if the backend rejects the order.
#[instrument(skip_all)]
pub async fn submit<S: Storage>(
    cart: &CartStore<S>,
    client: &BackendClient,
    details: &BuyerDetails,
) -> Result<Receipt, CheckoutError> {
    let buyer = details.validate().map_err(CheckoutError::Invalid)?;

    let Some(token) = account::token(cart.storage()).await? else {
        return Err(CheckoutError::LoginRequired);
    };

    let snapshot = cart.load().await?;
    if snapshot.cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let order = CheckoutRequest::new(&snapshot.cart, buyer);
    let confirmation = client.checkout(&token, &order).await.inspect_err(|e| {
        tracing::warn!(error = %e, "order rejected, keeping cart");
    })?;

    cart.clear().await?;
    tracing::info!(
        lines = snapshot.line_count(),
        total = %snapshot.total(),
        "order placed"
    );

    Ok(Receipt {
        total: snapshot.total(),
        item_count: snapshot.item_count(),
        line_count: snapshot.line_count(),
        message: PAYMENT_REQUESTED_MESSAGE,
        placed_at: Utc::now(),
        confirmation,
    })
}
