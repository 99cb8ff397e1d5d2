//! Checkout command.

use soko_storefront::services::{CheckoutError, checkout};
use tracing::{info, warn};

use super::Context;

/// Place an order for the whole cart.
///
/// Missing buyer fields fall back to the logged-in profile.
pub async fn submit(
    ctx: &Context,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut details = checkout::prefill(ctx.storage()).await?;
    if let Some(name) = name {
        details.buyer_name = name;
    }
    if let Some(email) = email {
        details.buyer_email = email;
    }
    if let Some(phone) = phone {
        details.buyer_phone = phone;
    }

    let client = ctx.backend()?;
    match checkout::submit(&ctx.cart(), &client, &details).await {
        Ok(receipt) => {
            info!("{}", receipt.message);
            info!(
                "Paid {} for {} items",
                receipt.total.display(),
                receipt.item_count
            );
            Ok(())
        }
        Err(CheckoutError::Invalid(errors)) => {
            for (field, message) in errors.iter() {
                warn!(field = ?field, "{message}");
            }
            Err("buyer details are invalid".into())
        }
        Err(CheckoutError::LoginRequired) => Err("please log in first (soko login)".into()),
        Err(err @ CheckoutError::Backend(_)) => {
            warn!("Your cart was kept");
            Err(err.backend_message().to_string().into())
        }
        Err(err) => Err(err.into()),
    }
}
