//! Kenyan mobile phone numbers.
//!
//! Checkout sends the buyer's phone to the backend, which pushes an M-Pesa
//! payment prompt to it, so only Kenyan mobile numbers are accepted:
//! `07XXXXXXXX`, `01XXXXXXXX`, `2547XXXXXXXX`, or `+2547XXXXXXXX`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The number does not start with `0`, `254`, or `+254`.
    #[error("phone number must start with 0, 254 or +254")]
    InvalidPrefix,
    /// The subscriber number does not start with 1 or 7.
    #[error("phone number must be a Kenyan mobile number (07... or 01...)")]
    NotMobile,
    /// The subscriber number is not exactly nine digits.
    #[error("phone number must have {expected} digits after the prefix")]
    InvalidLength {
        /// Required number of digits after the prefix.
        expected: usize,
    },
}

/// A Kenyan mobile phone number, kept as entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const SUBSCRIBER_DIGITS: usize = 9;

    /// Parse a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is a prefix (`0`, `254`, `+254`)
    /// followed by nine ASCII digits, the first of which is `1` or `7`.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let subscriber = subscriber_part(s).ok_or(PhoneError::InvalidPrefix)?;

        if !matches!(subscriber.as_bytes().first(), Some(b'1' | b'7')) {
            return Err(PhoneError::NotMobile);
        }

        if subscriber.len() != Self::SUBSCRIBER_DIGITS
            || !subscriber.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(PhoneError::InvalidLength {
                expected: Self::SUBSCRIBER_DIGITS,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the number as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn subscriber_part(s: &str) -> Option<&str> {
    s.strip_prefix("+254")
        .or_else(|| s.strip_prefix("254"))
        .or_else(|| s.strip_prefix('0'))
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}
