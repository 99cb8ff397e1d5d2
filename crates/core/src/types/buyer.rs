//! Buyer contact details and the checkout request sent to the backend.
//!
//! Validation here is local only. Nothing is sent until every field passes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::cart::Cart;
use super::email::Email;
use super::id::ProductId;
use super::phone::PhoneNumber;
use super::price::Price;
use super::quantity::Quantity;

/// Contact fields as entered on the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerDetails {
    #[serde(default)]
    pub buyer_name: String,
    #[serde(default)]
    pub buyer_email: String,
    #[serde(default)]
    pub buyer_phone: String,
}

/// A checkout form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyerField {
    BuyerName,
    BuyerEmail,
    BuyerPhone,
}

/// Per-field validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuyerErrors(BTreeMap<BuyerField, String>);

impl BuyerErrors {
    /// Whether no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: BuyerField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Iterate over `(field, message)` pairs in form order.
    pub fn iter(&self) -> impl Iterator<Item = (BuyerField, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn set(&mut self, field: BuyerField, message: &str) {
        self.0.insert(field, message.to_owned());
    }
}

impl std::fmt::Display for BuyerErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.0.values().map(String::as_str).collect();
        f.write_str(&messages.join("; "))
    }
}

/// Buyer details that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBuyer {
    pub name: String,
    pub email: Email,
    pub phone: PhoneNumber,
}

impl BuyerDetails {
    /// Pre-fill the form from a stored user profile.
    ///
    /// Reads the profile's `name`, `email` and `phone` fields; anything missing
    /// or not a string stays empty.
    #[must_use]
    pub fn from_profile(profile: &Map<String, Value>) -> Self {
        let field = |name: &str| {
            profile
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };
        Self {
            buyer_name: field("name"),
            buyer_email: field("email"),
            buyer_phone: field("phone"),
        }
    }

    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns all field errors at once: each field is required, the email
    /// must look like `local@domain.tld`, and the phone must be a Kenyan
    /// mobile number.
    pub fn validate(&self) -> Result<ValidBuyer, BuyerErrors> {
        let mut errors = BuyerErrors::default();

        if self.buyer_name.trim().is_empty() {
            errors.set(BuyerField::BuyerName, "Name is required");
        }

        let email = if self.buyer_email.trim().is_empty() {
            errors.set(BuyerField::BuyerEmail, "Email is required");
            None
        } else {
            Email::parse(&self.buyer_email)
                .inspect_err(|_| errors.set(BuyerField::BuyerEmail, "Invalid email format"))
                .ok()
        };

        let phone = if self.buyer_phone.trim().is_empty() {
            errors.set(BuyerField::BuyerPhone, "Phone is required");
            None
        } else {
            PhoneNumber::parse(&self.buyer_phone)
                .inspect_err(|_| errors.set(BuyerField::BuyerPhone, "Invalid Kenyan phone number"))
                .ok()
        };

        match (email, phone) {
            (Some(email), Some(phone)) if errors.is_empty() => Ok(ValidBuyer {
                name: self.buyer_name.clone(),
                email,
                phone,
            }),
            _ => Err(errors),
        }
    }
}

/// One ordered product in a checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,
    pub quantity: Quantity,
    pub price: Price,
}

/// Body of the backend's order submission call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<OrderItem>,
    pub buyer_name: String,
    pub buyer_email: Email,
    pub buyer_phone: PhoneNumber,
}

impl CheckoutRequest {
    /// One order covering every line of `cart`.
    #[must_use]
    pub fn new(cart: &Cart, buyer: ValidBuyer) -> Self {
        Self {
            items: cart
                .lines()
                .iter()
                .map(|line| OrderItem {
                    product: line.id.clone(),
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
            buyer_name: buyer.name,
            buyer_email: buyer.email,
            buyer_phone: buyer.phone,
        }
    }
}
