//! Order types.
//!
//! An order owns a detached copy of the cart lines it was placed from,
//! including the product name, so catalog edits and deletions never reach
//! placed orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cakeshop_core::{OrderId, OrderStatus, PaymentMethod, Price, ProductId, UserId};

use super::payment::Payment;

/// A line of a placed order. Stored as JSONB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Price,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner details shown on admin order listings.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCustomer {
    pub name: String,
    pub email: String,
}

/// An order as seen by an admin: joined with its owner and payment.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub order: Order,
    pub customer: OrderCustomer,
    pub payment: Option<Payment>,
}
