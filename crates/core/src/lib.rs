//! Soko Core - Shared types library.
//!
//! This crate provides common types used across all Soko components:
//! - `storefront` - Cart store, backend API client, and the JSON storefront server
//! - `cli` - Terminal shopper over a file-backed storage directory
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, emails, phones,
//!   products, cart line items, and checkout payloads
//! - [`catalog`] - Product search and category filtering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod types;

pub use types::*;
