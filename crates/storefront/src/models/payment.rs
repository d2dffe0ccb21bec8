//! Payment records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use cakeshop_core::{MaskedCard, OrderId, PaymentId, PaymentMethod, Price, UserId};

/// A recorded payment. Card payments keep only the last four digits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub method: PaymentMethod,
    pub masked_card_suffix: Option<MaskedCard>,
    pub card_expiry: Option<String>,
    pub amount: Price,
    pub created_at: DateTime<Utc>,
}
