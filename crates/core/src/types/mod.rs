//! Core types for the cake shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod card;
pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use card::{CardError, CardExpiry, MaskedCard};
pub use cart::{Cart, CartItem, CartRuleError, MAX_ITEM_QUANTITY};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use status::*;
