//! Cart views returned by the cart endpoints.

use serde::Serialize;

use cakeshop_core::{Price, ProductId};

/// One cart line joined with its catalog entry for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    /// Unit price captured when the line was created.
    pub price: Price,
    pub line_total: Price,
}

/// A cart snapshot: lines in insertion order and the derived total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Price,
}
