//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are non-negative amounts in the shop's currency (Kenyan shillings).
//! They are stored and sent as plain JSON numbers, but decoding is lenient:
//! backends commonly serialize decimals as strings (`"1000.00"`), and a cart
//! written by another client may hold anything at all.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::quantity::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Kenyan shilling.
    #[default]
    KES,
}

impl CurrencyCode {
    /// Symbol used in front of formatted amounts.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::KES => "Ksh",
        }
    }
}

/// A non-negative amount of money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero shillings.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if the amount is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of shillings.
    #[must_use]
    pub fn from_shillings(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    /// Decode a price from arbitrary JSON.
    ///
    /// Numbers and numeric strings are accepted. Anything else, including
    /// negative amounts, decodes as zero.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let parsed = match value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        };
        parsed.and_then(|d| Self::new(d).ok()).unwrap_or_default()
    }

    /// Get the underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, saturating at the largest representable amount.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity.get()))
                .unwrap_or(Decimal::MAX),
        )
    }

    /// Format for display with the currency symbol (e.g., "Ksh 1,300").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{} {}", CurrencyCode::KES.symbol(), self)
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Formats the amount with thousands separators and at most two decimals,
/// without the currency symbol: `1234.5` becomes `1,234.5`.
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2).normalize();
        let text = rounded.to_string();
        let (whole, fraction) = text.split_once('.').unwrap_or((&text, ""));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        if fraction.is_empty() {
            f.write_str(&grouped)
        } else {
            write!(f, "{grouped}.{fraction}")
        }
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = parse_decimal(s.trim()).ok_or_else(|| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

/// Serialized as a JSON number: integers stay integers (`1000`), fractional
/// amounts become floats (`999.5`).
impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let normalized = self.0.normalize();
        if normalized.scale() == 0
            && let Some(whole) = normalized.to_i64()
        {
            return serializer.serialize_i64(whole);
        }
        serializer.serialize_f64(normalized.to_f64().unwrap_or(0.0))
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_new_rejects_negative() {
        assert!(matches!(
            Price::new(Decimal::from(-1)),
            Err(PriceError::Negative(_))
        ));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_from_json_accepts_numbers_and_strings() {
        assert_eq!(Price::from_json(&json!(1000)), Price::from_shillings(1000));
        assert_eq!(
            Price::from_json(&json!("1000.00")),
            Price::from_shillings(1000)
        );
        assert_eq!(
            Price::from_json(&json!(12.5)).amount(),
            Decimal::new(125, 1)
        );
    }

    #[test]
    fn test_from_json_defaults_to_zero() {
        assert_eq!(Price::from_json(&json!(null)), Price::ZERO);
        assert_eq!(Price::from_json(&json!("cheap")), Price::ZERO);
        assert_eq!(Price::from_json(&json!(-5)), Price::ZERO);
        assert_eq!(Price::from_json(&json!({"amount": 5})), Price::ZERO);
    }

    #[test]
    fn test_serialize_as_number() {
        assert_eq!(
            serde_json::to_string(&Price::from_shillings(1000)).unwrap(),
            "1000"
        );
        let half: Price = "999.50".parse().unwrap();
        assert_eq!(serde_json::to_string(&half).unwrap(), "999.5");
    }

    #[test]
    fn test_times_quantity() {
        let price = Price::from_shillings(500);
        let two = Quantity::new(2).unwrap();
        assert_eq!(price.times(two), Price::from_shillings(1000));
    }

    #[test]
    fn test_sum() {
        let total: Price = [500, 300, 200]
            .into_iter()
            .map(Price::from_shillings)
            .sum();
        assert_eq!(total, Price::from_shillings(1000));

        let empty: Price = std::iter::empty().sum();
        assert_eq!(empty, Price::ZERO);
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_shillings(0).to_string(), "0");
        assert_eq!(Price::from_shillings(999).to_string(), "999");
        assert_eq!(Price::from_shillings(1000).to_string(), "1,000");
        assert_eq!(Price::from_shillings(1_234_567).to_string(), "1,234,567");
        assert_eq!("1234.50".parse::<Price>().unwrap().to_string(), "1,234.5");
        assert_eq!("0.129".parse::<Price>().unwrap().to_string(), "0.13");
    }

    #[test]
    fn test_display_with_symbol() {
        assert_eq!(Price::from_shillings(1300).display(), "Ksh 1,300");
    }
}
