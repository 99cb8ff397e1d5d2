//! Cart line items, the in-memory cart model, and its storage encoding.
//!
//! The persisted form is a JSON array of line objects, compatible with carts
//! written by older clients: lines without a `key` get one on decode, and any
//! product fields this crate does not model are carried along untouched.

use serde::Serialize;
use serde_json::{Map, Value};

use super::id::{LineKey, ProductId};
use super::price::Price;
use super::product::Product;
use super::quantity::Quantity;

/// One product the shopper wants to buy.
///
/// Display fields are copied from the product when the line is created and
/// are not refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineItem {
    pub key: LineKey,
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: Quantity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartLineItem {
    /// Start a new line for `product` with a quantity of one.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        let mut extra = product.extra.clone();
        if let Some(description) = &product.description {
            extra.insert("description".to_owned(), Value::String(description.clone()));
        }
        if let Some(discount) = product.discount
            && let Ok(value) = serde_json::to_value(discount)
        {
            extra.insert("discount".to_owned(), value);
        }

        Self {
            key: LineKey::generate(),
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
            quantity: Quantity::ONE,
            extra,
        }
    }

    /// `price × quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Reference to one line of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRef {
    /// Stable reference by line key.
    Key(LineKey),
    /// Zero-based position in the list as it is stored right now.
    Index(usize),
}

impl From<LineKey> for LineRef {
    fn from(key: LineKey) -> Self {
        Self::Key(key)
    }
}

/// Sum of `price × quantity` over `items`. Zero for an empty slice.
#[must_use]
pub fn calculate_total(items: &[CartLineItem]) -> Price {
    items.iter().map(CartLineItem::line_total).sum()
}

/// An ordered list of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from existing lines, keeping their order.
    #[must_use]
    pub const fn from_lines(lines: Vec<CartLineItem>) -> Self {
        Self { lines }
    }

    /// The lines, in order.
    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// Consume the cart and return its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLineItem> {
        self.lines
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        calculate_total(&self.lines)
    }

    /// Add one unit of `product`.
    ///
    /// Increments the first line holding the same product id, or appends a new
    /// line with quantity one. Returns the key of the affected line.
    pub fn add_product(&mut self, product: &Product) -> LineKey {
        if let Some(line) = self.lines.iter_mut().find(|line| line.id == product.id) {
            line.quantity = line.quantity.increment();
            return line.key;
        }
        let line = CartLineItem::from_product(product);
        let key = line.key;
        self.lines.push(line);
        key
    }

    /// Resolve a line reference to a position in this cart.
    #[must_use]
    pub fn position(&self, line: LineRef) -> Option<usize> {
        match line {
            LineRef::Key(key) => self.lines.iter().position(|l| l.key == key),
            LineRef::Index(index) => (index < self.lines.len()).then_some(index),
        }
    }

    /// Get a line by reference.
    #[must_use]
    pub fn get(&self, line: LineRef) -> Option<&CartLineItem> {
        self.position(line).and_then(|index| self.lines.get(index))
    }

    /// Set the quantity of a line. Returns `false` if the line does not exist.
    pub fn set_quantity(&mut self, line: LineRef, quantity: Quantity) -> bool {
        match self.position(line).and_then(|index| self.lines.get_mut(index)) {
            Some(l) => {
                l.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line and return it.
    pub fn remove(&mut self, line: LineRef) -> Option<CartLineItem> {
        self.position(line).map(|index| self.lines.remove(index))
    }
}

/// Errors that can occur when decoding or encoding a stored cart.
#[derive(thiserror::Error, Debug)]
pub enum CartCodecError {
    /// The stored text is not JSON.
    #[error("stored cart is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The stored JSON is not an array.
    #[error("stored cart is not a list (found {found})")]
    NotAList {
        /// JSON type that was found instead.
        found: &'static str,
    },
    /// Serialization failed.
    #[error("failed to encode cart: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result of decoding a stored cart.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCart {
    pub cart: Cart,
    /// Entries that were skipped because they were not objects or had no usable `id`.
    pub dropped: usize,
    /// Whether any line was missing its key and got a fresh one.
    pub assigned_keys: bool,
}

/// Decode the stored representation of a cart.
///
/// # Errors
///
/// Returns [`CartCodecError::Malformed`] if `raw` is not JSON, and
/// [`CartCodecError::NotAList`] if it is JSON but not an array. Bad entries
/// inside a valid array are skipped and counted instead.
pub fn decode_cart(raw: &str) -> Result<DecodedCart, CartCodecError> {
    let value: Value = serde_json::from_str(raw).map_err(CartCodecError::Malformed)?;
    let entries = match value {
        Value::Array(entries) => entries,
        other => {
            return Err(CartCodecError::NotAList {
                found: json_type_name(&other),
            });
        }
    };

    let mut lines = Vec::with_capacity(entries.len());
    let mut dropped = 0;
    let mut assigned_keys = false;

    for entry in entries {
        match decode_line(entry) {
            Some((line, generated)) => {
                assigned_keys |= generated;
                lines.push(line);
            }
            None => dropped += 1,
        }
    }

    Ok(DecodedCart {
        cart: Cart::from_lines(lines),
        dropped,
        assigned_keys,
    })
}

/// Encode a cart for storage.
///
/// # Errors
///
/// Returns [`CartCodecError::Encode`] if serialization fails.
pub fn encode_cart(cart: &Cart) -> Result<String, CartCodecError> {
    serde_json::to_string(cart).map_err(CartCodecError::Encode)
}

fn decode_line(entry: Value) -> Option<(CartLineItem, bool)> {
    let Value::Object(mut fields) = entry else {
        return None;
    };

    let id: ProductId = serde_json::from_value(fields.remove("id")?).ok()?;

    let existing_key = fields
        .remove("key")
        .and_then(|v| v.as_str().and_then(|s| s.parse::<LineKey>().ok()));
    let generated = existing_key.is_none();
    let key = existing_key.unwrap_or_else(LineKey::generate);

    let name = match fields.remove("name") {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let price = fields
        .remove("price")
        .map_or(Price::ZERO, |v| Price::from_json(&v));
    let quantity = fields
        .remove("quantity")
        .map_or(Quantity::ONE, |v| Quantity::from_json(&v));
    let image = take_string(&mut fields, "image");
    let category = take_string(&mut fields, "category");

    Some((
        CartLineItem {
            key,
            id,
            name,
            price,
            image,
            category,
            quantity,
            extra: fields,
        },
        generated,
    ))
}

fn take_string(fields: &mut Map<String, Value>, name: &str) -> Option<String> {
    match fields.remove(name) {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => {
            // Keep unexpected shapes rather than losing them.
            fields.insert(name.to_owned(), other);
            None
        }
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
