//! Domain models for the storefront.
//!
//! These are the shapes handed to route handlers and serialized on the
//! wire (camelCase). Database row types stay private to `crate::db`.

pub mod card_info;
pub mod cart;
pub mod contact;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

pub use card_info::CardOnFile;
pub use cart::{CartLine, CartView};
pub use contact::{ContactMessage, NewContactMessage};
pub use order::{AdminOrder, Order, OrderCustomer, OrderItem};
pub use payment::Payment;
pub use product::{NewProduct, Product};
pub use user::User;
