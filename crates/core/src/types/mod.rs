//! Core types for Soko.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod buyer;
pub mod cart;
pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod product;
pub mod quantity;

pub use buyer::{BuyerDetails, BuyerField, BuyerErrors, CheckoutRequest, OrderItem, ValidBuyer};
pub use cart::{
    Cart, CartCodecError, CartLineItem, DecodedCart, LineRef, calculate_total, decode_cart,
    encode_cart,
};
pub use email::{Email, EmailError};
pub use id::{LineKey, LineKeyError, ProductId};
pub use phone::{PhoneError, PhoneNumber};
pub use price::{CurrencyCode, Price, PriceError};
pub use product::Product;
pub use quantity::Quantity;
