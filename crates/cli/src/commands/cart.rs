//! Cart commands.
//!
//! Lines are named either by their key or by their 1-based position as shown
//! by `soko cart show`.

use soko_core::{LineKey, LineRef, ProductId};
use soko_storefront::cart::CartSnapshot;
use tracing::{info, warn};

use super::Context;

/// Parse a line argument: a line key, or a 1-based position.
pub fn parse_line(arg: &str) -> Result<LineRef, String> {
    if let Ok(key) = arg.parse::<LineKey>() {
        return Ok(LineRef::Key(key));
    }
    match arg.parse::<usize>() {
        Ok(0) => Err("line positions start at 1".to_string()),
        Ok(position) => Ok(LineRef::Index(position - 1)),
        Err(_) => Err(format!("'{arg}' is neither a line key nor a position")),
    }
}

fn print(snapshot: &CartSnapshot) {
    if let Some(issue) = snapshot.issue {
        warn!("{}", issue.message());
    }
    if snapshot.cart.is_empty() {
        info!("Your cart is empty (version {})", snapshot.version);
        return;
    }
    for (position, line) in snapshot.items().iter().enumerate() {
        info!(
            "{:>3}. {:<40} {:>4} x {:>12} = {:>14}  [{}]",
            position + 1,
            line.name,
            line.quantity,
            line.price.display(),
            line.line_total().display(),
            line.key,
        );
    }
    info!(
        "{} items, total {} (version {})",
        snapshot.item_count(),
        snapshot.total().display(),
        snapshot.version,
    );
}

pub async fn show(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = ctx.cart().load().await?;
    print(&snapshot);
    Ok(())
}

pub async fn add(ctx: &Context, product_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.backend()?;
    let id = ProductId::Text(product_id.to_string());
    let Some(product) = client.product(&id).await? else {
        return Err(format!("product '{product_id}' not found").into());
    };

    let snapshot = ctx.cart().add_item(&product).await?;
    info!("Added {} to your cart", product.name);
    print(&snapshot);
    Ok(())
}

pub async fn update(
    ctx: &Context,
    line: &str,
    quantity: i64,
    if_version: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let line = parse_line(line)?;
    if quantity < 1 {
        warn!("Quantity must be at least 1; cart unchanged");
    }
    let snapshot = ctx.cart().update_quantity(line, quantity, if_version).await?;
    print(&snapshot);
    Ok(())
}

pub async fn remove(
    ctx: &Context,
    line: &str,
    if_version: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let line = parse_line(line)?;
    let snapshot = ctx.cart().remove_item(line, if_version).await?;
    info!("Line removed");
    print(&snapshot);
    Ok(())
}

pub async fn clear(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    ctx.cart().clear().await?;
    info!("Cart cleared");
    Ok(())
}
