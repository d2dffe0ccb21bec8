//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Signup, login, session tokens
//! - `cart` - Cart Manager (add, remove, set quantity, snapshot)
//! - `orders` - Order Workflow (place, status transitions, listings)
//! - `payments` - Payment Recorder and card on file
//! - `seed` - Idempotent admin and catalog bootstrap
//! - `users` - Admin management of customer accounts
//!
//! Services validate their inputs before touching the store and own the
//! transaction boundaries of the multi-step writes.

pub mod auth;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod seed;
pub mod users;
