//! Business logic services for storefront.
//!
//! # Services
//!
//! - `account` - Login, registration, and logout against the shop backend
//! - `checkout` - Buyer details and order submission

pub mod account;
pub mod checkout;

pub use account::{AccountError, Credentials};
pub use checkout::{CheckoutError, Receipt};
