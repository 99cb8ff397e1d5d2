//! Product catalog route handler.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Serialize;
use soko_core::{
    Product,
    catalog::{self, ProductFilter},
};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// A category choice for the filter menu.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Catalog page data.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogView {
    pub products: Vec<Product>,
    pub categories: Vec<CategoryOption>,
    pub on_sale: Vec<Product>,
    pub search: String,
    pub category: String,
}

/// List products, filtered by `search` and `category`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<CatalogView>> {
    let products = state.backend().products().await?;

    let selected = filter
        .category
        .clone()
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| catalog::ALL_CATEGORIES.to_string());

    let categories = catalog::categories(&products)
        .into_iter()
        .map(|value| CategoryOption {
            label: catalog::format_category_name(&value),
            selected: value == selected,
            value,
        })
        .collect();

    Ok(Json(CatalogView {
        products: filter.apply(&products).into_iter().cloned().collect(),
        categories,
        on_sale: catalog::on_sale(&products).into_iter().cloned().collect(),
        search: filter.search.clone(),
        category: selected,
    }))
}
