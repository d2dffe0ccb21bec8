//! Cake Shop Core - Shared domain types and rules.
//!
//! This crate provides the types used across all cake shop components:
//! - `storefront` - The REST backend (catalog, cart, orders, payments, admin)
//! - `cli` - Command-line tools for migrations, seeding and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. The cart merge logic and the order status state machine
//! live here so they can be exercised without a running store.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, statuses, the cart aggregate
//!   and payment card masking

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
