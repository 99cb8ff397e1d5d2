//! Catalog listing.

use soko_core::catalog::{self, ProductFilter};
use tracing::info;

use super::Context;

/// List products matching `search` and `category`.
pub async fn list(
    ctx: &Context,
    search: String,
    category: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ctx.backend()?;
    let products = client.products().await?;

    let filter = ProductFilter { search, category };
    let matching = filter.apply(&products);

    if matching.is_empty() {
        info!("No products found");
        return Ok(());
    }

    for product in &matching {
        let sale = if product.is_on_sale() { " (sale)" } else { "" };
        info!(
            "{:>6}  {:<40} {:>14}  {}{sale}",
            product.id,
            product.name,
            product.price.display(),
            catalog::format_category_name(product.category_or_default()),
        );
    }

    let categories: Vec<String> = catalog::categories(&products)
        .iter()
        .map(|c| catalog::format_category_name(c))
        .collect();
    info!("{} of {} products. Categories: {}", matching.len(), products.len(), categories.join(", "));
    Ok(())
}
