//! Catalog browsing: search, category filter, and sale picks.
//!
//! Matching is deliberately simple: case-insensitive substring search over
//! name and description, and exact category equality.

use serde::Deserialize;

use crate::types::Product;

/// Category value that matches every product.
pub const ALL_CATEGORIES: &str = "all";

/// Category assigned to products that have none.
pub const UNCATEGORIZED: &str = "uncategorized";

/// How many discounted products the sale strip shows.
pub const SALE_LIMIT: usize = 4;

/// Search term and category selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductFilter {
    /// Whether `product` passes both the search and the category filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        self.matches_search(product) && self.matches_category(product)
    }

    /// Products passing the filter, in catalog order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        products.iter().filter(|p| self.matches(p)).collect()
    }

    fn matches_search(&self, product: &Product) -> bool {
        let term = self.search.to_lowercase();
        if term.is_empty() {
            return true;
        }
        product.name.to_lowercase().contains(&term)
            || product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }

    fn matches_category(&self, product: &Product) -> bool {
        match self.category.as_deref() {
            None | Some("" | ALL_CATEGORIES) => true,
            Some(category) => product.category_or_default() == category,
        }
    }
}

/// `"all"` followed by each distinct category in first-seen order.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    let mut out = vec![ALL_CATEGORIES.to_owned()];
    for product in products {
        let category = product.category_or_default();
        if !out.iter().any(|c| c == category) {
            out.push(category.to_owned());
        }
    }
    out
}

/// The first few discounted products.
#[must_use]
pub fn on_sale(products: &[Product]) -> Vec<&Product> {
    products
        .iter()
        .filter(|p| p.is_on_sale())
        .take(SALE_LIMIT)
        .collect()
}

/// Human label for a category: `"all"` reads "All Categories", anything else
/// is capitalized (`"PHONES"` → `"Phones"`).
#[must_use]
pub fn format_category_name(category: &str) -> String {
    if category == ALL_CATEGORIES {
        return "All Categories".to_owned();
    }
    let mut chars = category.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect()
    })
}
