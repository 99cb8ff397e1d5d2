//! Line item quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// How many units of a product a cart line holds. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit, the quantity of every freshly added line.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, rejecting zero.
    #[must_use]
    pub const fn new(n: u32) -> Option<Self> {
        match NonZeroU32::new(n) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Create a quantity from a signed request value.
    ///
    /// Returns `None` for anything below one. Requests above `u32::MAX`
    /// saturate.
    #[must_use]
    pub fn from_requested(n: i64) -> Option<Self> {
        if n < 1 {
            return None;
        }
        Self::new(u32::try_from(n).unwrap_or(u32::MAX))
    }

    /// Decode a stored quantity.
    ///
    /// Missing, null, zero, negative, fractional or otherwise unusable values
    /// count as one.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let n = match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 1.0).map(float_to_u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        n.and_then(|n| Self::new(u32::try_from(n).unwrap_or(u32::MAX)))
            .unwrap_or(Self::ONE)
    }

    /// Get the count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// One more unit, saturating at `u32::MAX`.
    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)] // caller checked >= 1 and whole
fn float_to_u64(f: f64) -> u64 {
    f.min(u64::MAX as f64) as u64
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
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
    fn test_new_rejects_zero() {
        assert!(Quantity::new(0).is_none());
        assert_eq!(Quantity::new(3).unwrap().get(), 3);
    }

    #[test]
    fn test_from_requested() {
        assert!(Quantity::from_requested(-1).is_none());
        assert!(Quantity::from_requested(0).is_none());
        assert_eq!(Quantity::from_requested(5).unwrap().get(), 5);
    }

    #[test]
    fn test_from_requested_saturates() {
        assert_eq!(
            Quantity::from_requested(5_000_000_000).unwrap().get(),
            u32::MAX
        );
        assert_eq!(Quantity::from_requested(i64::MAX).unwrap().get(), u32::MAX);
    }

    #[test]
    fn test_from_json_defaults_to_one() {
        assert_eq!(Quantity::from_json(&json!(null)), Quantity::ONE);
        assert_eq!(Quantity::from_json(&json!(0)), Quantity::ONE);
        assert_eq!(Quantity::from_json(&json!(-3)), Quantity::ONE);
        assert_eq!(Quantity::from_json(&json!(1.5)), Quantity::ONE);
        assert_eq!(Quantity::from_json(&json!([2])), Quantity::ONE);
    }

    #[test]
    fn test_from_json_accepts_whole_numbers() {
        assert_eq!(Quantity::from_json(&json!(4)).get(), 4);
        assert_eq!(Quantity::from_json(&json!(4.0)).get(), 4);
        assert_eq!(Quantity::from_json(&json!("2")).get(), 2);
    }

    #[test]
    fn test_increment_saturates() {
        assert_eq!(Quantity::ONE.increment().get(), 2);
        let max = Quantity::new(u32::MAX).unwrap();
        assert_eq!(max.increment(), max);
    }

    #[test]
    fn test_serialize_as_number() {
        assert_eq!(
            serde_json::to_string(&Quantity::new(3).unwrap()).unwrap(),
            "3"
        );
    }
}
