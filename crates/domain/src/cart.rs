//! A client's draft order before it is placed.

use serde::{Deserialize, Serialize};

use crate::order::{ItemRequest, OrderError, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Unpriced product selections owned by one session.
///
/// Prices are looked up at checkout, not when lines are added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` of a product, merging with an existing line.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<(), OrderError> {
        if quantity == 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        self.push_merged(product_id, quantity);
        Ok(())
    }

    /// Folds `other` into this cart; lines it adds for new products keep
    /// their order after the existing ones.
    pub fn merge(&mut self, other: Cart) {
        for line in other.lines {
            self.push_merged(line.product_id, line.quantity);
        }
    }

    fn push_merged(&mut self, product_id: ProductId, quantity: u32) {
        match self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of every line's quantity, saturating at `u32::MAX`.
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.quantity))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// The cart as a batch for the ledger.
    pub fn item_requests(&self) -> Vec<ItemRequest> {
        self.lines
            .iter()
            .map(|line| ItemRequest::new(line.product_id.clone(), line.quantity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_same_product_merges() {
        let mut cart = Cart::new();
        cart.add(ProductId::new("soup"), 1).unwrap();
        cart.add(ProductId::new("bread"), 2).unwrap();
        cart.add(ProductId::new("soup"), 2).unwrap();

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.add(ProductId::new("soup"), 0),
            Err(OrderError::InvalidQuantity { quantity: 0 })
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn item_requests_keep_line_order() {
        let mut cart = Cart::new();
        cart.add(ProductId::new("bread"), 1).unwrap();
        cart.add(ProductId::new("soup"), 2).unwrap();

        assert_eq!(
            cart.item_requests(),
            vec![ItemRequest::new("bread", 1), ItemRequest::new("soup", 2)]
        );

        cart.clear();
        assert!(cart.item_requests().is_empty());
    }

    #[test]
    fn total_quantity_saturates_instead_of_overflowing() {
        let mut cart = Cart::new();
        cart.add(ProductId::new("soup"), 3_000_000_000).unwrap();
        cart.add(ProductId::new("bread"), 3_000_000_000).unwrap();

        assert_eq!(cart.total_quantity(), u32::MAX);

        cart.add(ProductId::new("soup"), 3_000_000_000).unwrap();
        assert_eq!(cart.lines()[0].quantity, u32::MAX);
    }

    #[test]
    fn merge_adds_quantities_and_appends_new_products() {
        let mut restored = Cart::new();
        restored.add(ProductId::new("soup"), 1).unwrap();
        restored.add(ProductId::new("bread"), 1).unwrap();

        let mut newer = Cart::new();
        newer.add(ProductId::new("bread"), 2).unwrap();
        newer.add(ProductId::new("wine"), 1).unwrap();

        restored.merge(newer);
        assert_eq!(
            restored.item_requests(),
            vec![
                ItemRequest::new("soup", 1),
                ItemRequest::new("bread", 3),
                ItemRequest::new("wine", 1),
            ]
        );

        restored.merge(Cart::new());
        assert_eq!(restored.total_quantity(), 5);
    }
}
