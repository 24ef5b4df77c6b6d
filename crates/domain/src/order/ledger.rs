//! Turning requested products into priced line items.

use serde::{Deserialize, Serialize};

use crate::directory::Catalog;

use super::{LineItem, OrderError, ProductId};

/// A product and quantity asked for by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl ItemRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ProductNotFound,
    InvalidQuantity,
}

/// A request that did not become a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub reason: SkipReason,
}

/// Outcome of pricing a batch.
#[derive(Debug, Clone, Default)]
pub struct PricedItems {
    pub lines: Vec<LineItem>,
    pub skipped: Vec<SkippedItem>,
}

/// Prices each request at the catalog's current price.
///
/// Unknown products and zero quantities are skipped and reported; the rest
/// of the batch still goes through. Fails with `EmptyOrder` only when nothing
/// could be priced.
pub async fn price_items<C>(
    catalog: &C,
    requests: &[ItemRequest],
) -> Result<PricedItems, OrderError>
where
    C: Catalog + ?Sized,
{
    let mut priced = PricedItems::default();

    for request in requests {
        let skip = |reason| SkippedItem {
            product_id: request.product_id.clone(),
            quantity: request.quantity,
            reason,
        };

        if request.quantity == 0 {
            priced.skipped.push(skip(SkipReason::InvalidQuantity));
            continue;
        }

        match catalog.resolve_product(&request.product_id).await {
            Some(product) => priced.lines.push(LineItem::new(
                product.id,
                product.name,
                request.quantity,
                product.price,
            )),
            None => {
                tracing::debug!(product_id = %request.product_id, "skipping unknown product");
                priced.skipped.push(skip(SkipReason::ProductNotFound));
            }
        }
    }

    if priced.lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    Ok(priced)
}
