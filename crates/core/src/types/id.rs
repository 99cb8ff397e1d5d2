//! Identifiers for catalog products and cart lines.
//!
//! Product ids come from the backend and may be integers or strings, so
//! [`ProductId`] keeps whichever form it was given. Cart lines get their own
//! [`LineKey`], generated locally, because the same product can appear on
//! more than one line of a stored cart.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product identifier.
///
/// Serialized untagged: `1` and `"sku-1"` are both valid ids. An integer id
/// and a string id with the same digits are different ids.
///
/// ```
/// use soko_core::ProductId;
///
/// let numeric: ProductId = serde_json::from_str("1").unwrap();
/// let text: ProductId = serde_json::from_str("\"1\"").unwrap();
/// assert_eq!(numeric, ProductId::from(1));
/// assert_ne!(numeric, text);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    /// Integer id, as issued by most backends.
    Number(i64),
    /// Opaque string id.
    Text(String),
}

impl ProductId {
    /// Returns the integer form, if this is a numeric id.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Parses user input: anything that reads as an integer is a numeric id.
impl FromStr for ProductId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(s.parse::<i64>()
            .map_or_else(|_| Self::Text(s.to_owned()), Self::Number))
    }
}

/// Errors that can occur when parsing a [`LineKey`].
#[derive(thiserror::Error, Debug, Clone)]
#[error("invalid line key: {0}")]
pub struct LineKeyError(String);

/// Stable identifier of one cart line.
///
/// Generated when the line is created and persisted with it, so a line can be
/// addressed after other lines were added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineKey(Uuid);

impl LineKey {
    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LineKey {
    type Err = LineKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| LineKeyError(s.to_owned()))
    }
}
