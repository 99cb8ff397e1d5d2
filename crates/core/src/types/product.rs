//! Catalog products as served by the backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::ProductId;
use super::price::Price;

/// A catalog product.
///
/// Only `id` is required. Everything else falls back to a safe default so a
/// sparse or partially broken listing still renders and can be added to the
/// cart. Fields this type does not model are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default, deserialize_with = "string_or_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Price>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Category label used for filtering; products without one are "uncategorized".
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(crate::catalog::UNCATEGORIZED)
    }

    /// Whether the product carries a non-zero discount.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.discount.is_some_and(|d| d > Price::ZERO)
    }
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
