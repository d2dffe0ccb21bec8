//! The cart aggregate.
//!
//! A cart holds at most one line per product. Adding a product that is
//! already present bumps its quantity and keeps the price captured on the
//! first add, so a catalog price change mid-session never reprices a line.
//! The total is derived from the lines on demand and cannot be set.

use serde::{Deserialize, Serialize};

use super::id::{ProductId, UserId};
use super::price::{Price, PriceError};

/// Upper bound on the quantity of a single cart line.
pub const MAX_ITEM_QUANTITY: u32 = 999;

/// Rule violations raised by cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartRuleError {
    /// The product has no line in this cart.
    #[error("item {0} not found in cart")]
    ItemNotFound(ProductId),
    /// Quantity outside `1..=MAX_ITEM_QUANTITY`.
    #[error("quantity must be between 1 and {max} (got {got})", max = MAX_ITEM_QUANTITY)]
    InvalidQuantity { got: i64 },
    /// Total exceeded the representable range.
    #[error(transparent)]
    Price(#[from] PriceError),
}

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product reference. The cart does not own the product.
    pub product_id: ProductId,
    /// Always at least 1.
    pub quantity: u32,
    /// Unit price captured when the line was created.
    pub price: Price,
}

impl CartItem {
    /// `price * quantity`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the line total does not fit.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.price.times(self.quantity)
    }
}

/// A user's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
}

impl Cart {
    /// An empty cart for `user_id`.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }

    /// Rebuild a cart from stored lines, merging any duplicate products.
    #[must_use]
    pub fn from_items(user_id: UserId, items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new(user_id);
        for item in items {
            match cart.position(item.product_id) {
                Some(idx) => {
                    if let Some(existing) = cart.items.get_mut(idx) {
                        existing.quantity = existing
                            .quantity
                            .saturating_add(item.quantity)
                            .min(MAX_ITEM_QUANTITY);
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// Owner of the cart.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Line for `product_id`, if any.
    #[must_use]
    pub fn item(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
    }

    /// Σ price × quantity over all lines.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the total does not fit.
    pub fn total(&self) -> Result<Price, PriceError> {
        self.items
            .iter()
            .try_fold(Price::ZERO, |acc, item| acc.plus(item.line_total()?))
    }

    /// Add `quantity` of a product priced at `catalog_price`.
    ///
    /// An existing line keeps its original price and gains `quantity`;
    /// otherwise a new line is appended at `catalog_price`.
    ///
    /// # Errors
    ///
    /// Returns `CartRuleError::InvalidQuantity` if `quantity` is below 1 or
    /// the merged quantity would exceed [`MAX_ITEM_QUANTITY`], and
    /// `CartRuleError::Price` if the cart total would overflow.
    pub fn add(
        &mut self,
        product_id: ProductId,
        quantity: i64,
        catalog_price: Price,
    ) -> Result<&CartItem, CartRuleError> {
        let quantity = checked_quantity(quantity)?;

        let idx = match self.position(product_id) {
            Some(idx) => {
                let existing = self
                    .items
                    .get_mut(idx)
                    .ok_or(CartRuleError::ItemNotFound(product_id))?;
                let merged = existing.quantity + quantity;
                if merged > MAX_ITEM_QUANTITY {
                    return Err(CartRuleError::InvalidQuantity {
                        got: i64::from(merged),
                    });
                }
                existing.quantity = merged;
                idx
            }
            None => {
                self.items.push(CartItem {
                    product_id,
                    quantity,
                    price: catalog_price,
                });
                self.items.len() - 1
            }
        };

        self.total()?;
        self.items
            .get(idx)
            .ok_or(CartRuleError::ItemNotFound(product_id))
    }

    /// Remove the line for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns `CartRuleError::ItemNotFound` if there is no such line.
    pub fn remove(&mut self, product_id: ProductId) -> Result<CartItem, CartRuleError> {
        let idx = self
            .position(product_id)
            .ok_or(CartRuleError::ItemNotFound(product_id))?;
        Ok(self.items.remove(idx))
    }

    /// Overwrite the quantity of an existing line. A quantity below 1
    /// removes the line.
    ///
    /// Returns the updated line, or `None` when the line was removed.
    ///
    /// # Errors
    ///
    /// Returns `CartRuleError::ItemNotFound` if there is no such line and
    /// `CartRuleError::InvalidQuantity` above [`MAX_ITEM_QUANTITY`].
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Option<&CartItem>, CartRuleError> {
        if quantity < 1 {
            self.remove(product_id)?;
            return Ok(None);
        }
        let quantity = checked_quantity(quantity)?;
        let idx = self
            .position(product_id)
            .ok_or(CartRuleError::ItemNotFound(product_id))?;
        if let Some(item) = self.items.get_mut(idx) {
            item.quantity = quantity;
        }
        self.total()?;
        Ok(self.items.get(idx))
    }
}

fn checked_quantity(quantity: i64) -> Result<u32, CartRuleError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_ITEM_QUANTITY).contains(q))
        .ok_or(CartRuleError::InvalidQuantity { got: quantity })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(amount: i64) -> Price {
        Price::new(amount).unwrap()
    }

    fn cart() -> Cart {
        Cart::new(UserId::new(1))
    }

    const CAKE_A: ProductId = ProductId::new(10);
    const CAKE_B: ProductId = ProductId::new(20);

    #[test]
    fn test_repeated_add_merges_and_keeps_first_price() {
        let mut cart = cart();
        cart.add(CAKE_A, 2, price(100)).unwrap();
        // Catalog price changed between adds; the line keeps 100.
        cart.add(CAKE_A, 1, price(150)).unwrap();

        assert_eq!(cart.items().len(), 1);
        let line = cart.item(CAKE_A).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.price, price(100));
        assert_eq!(cart.total().unwrap(), price(300));
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = cart();
        cart.add(CAKE_B, 1, price(5)).unwrap();
        cart.add(CAKE_A, 1, price(7)).unwrap();
        cart.add(CAKE_B, 1, price(5)).unwrap();
        let ids: Vec<_> = cart.items().iter().map(|i| i.product_id).collect();
        assert_eq!(ids, vec![CAKE_B, CAKE_A]);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = cart();
        assert_eq!(
            cart.add(CAKE_A, 0, price(1)).unwrap_err(),
            CartRuleError::InvalidQuantity { got: 0 }
        );
        assert!(cart.add(CAKE_A, -3, price(1)).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_merge_beyond_cap() {
        let mut cart = cart();
        cart.add(CAKE_A, i64::from(MAX_ITEM_QUANTITY), price(1))
            .unwrap();
        assert!(cart.add(CAKE_A, 1, price(1)).is_err());
        assert_eq!(cart.item(CAKE_A).unwrap().quantity, MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let mut cart = cart();
        assert_eq!(
            cart.remove(CAKE_A).unwrap_err(),
            CartRuleError::ItemNotFound(CAKE_A)
        );
    }

    #[test]
    fn test_set_quantity_zero_equals_remove() {
        let mut via_set = cart();
        via_set.add(CAKE_A, 2, price(100)).unwrap();
        via_set.add(CAKE_B, 1, price(50)).unwrap();
        let mut via_remove = via_set.clone();

        assert!(via_set.set_quantity(CAKE_A, 0).unwrap().is_none());
        via_remove.remove(CAKE_A).unwrap();

        assert_eq!(via_set, via_remove);
        assert_eq!(via_set.total().unwrap(), price(50));
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let mut cart = cart();
        cart.add(CAKE_A, 2, price(100)).unwrap();
        let line = cart.set_quantity(CAKE_A, 5).unwrap().unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(cart.total().unwrap(), price(500));
    }

    #[test]
    fn test_set_quantity_missing_is_not_found() {
        let mut cart = cart();
        assert_eq!(
            cart.set_quantity(CAKE_A, 3).unwrap_err(),
            CartRuleError::ItemNotFound(CAKE_A)
        );
        assert_eq!(
            cart.set_quantity(CAKE_A, 0).unwrap_err(),
            CartRuleError::ItemNotFound(CAKE_A)
        );
    }

    #[test]
    fn test_total_tracks_every_mutation() {
        let mut cart = cart();
        let steps: [(ProductId, i64, i64); 4] =
            [(CAKE_A, 1, 299), (CAKE_B, 2, 349), (CAKE_A, 3, 1), (CAKE_B, 1, 1)];
        for (product, qty, unit) in steps {
            cart.add(product, qty, price(unit)).unwrap();
            let expected: i64 = cart
                .items()
                .iter()
                .map(|i| i.price.amount() * i64::from(i.quantity))
                .sum();
            assert_eq!(cart.total().unwrap().amount(), expected);
        }
        assert_eq!(cart.total().unwrap(), price(299 * 4 + 349 * 3));
    }

    #[test]
    fn test_from_items_merges_duplicates() {
        let items = vec![
            CartItem {
                product_id: CAKE_A,
                quantity: 1,
                price: price(10),
            },
            CartItem {
                product_id: CAKE_A,
                quantity: 2,
                price: price(99),
            },
        ];
        let cart = Cart::from_items(UserId::new(1), items);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.item(CAKE_A).unwrap().quantity, 3);
        assert_eq!(cart.item(CAKE_A).unwrap().price, price(10));
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let item = CartItem {
            product_id: CAKE_A,
            quantity: 2,
            price: price(100),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"productId": 10, "quantity": 2, "price": 100})
        );
    }
}
