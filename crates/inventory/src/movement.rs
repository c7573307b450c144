use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::ProductId;

/// Quantity of one product carried by a document line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Planned stock level change for one product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct StockChange {
    pub product_id: ProductId,
    pub before: i64,
    pub after: i64,
}

impl StockChange {
    pub fn delta(&self) -> i64 {
        self.after - self.before
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    #[error("quantity for product {product_id} must be positive (got {quantity})")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    Insufficient {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    #[error("stock level overflow for product {0}")]
    Overflow(ProductId),
}

/// Sum quantities per product, keeping first-seen order.
fn aggregate(lines: &[StockLine]) -> Result<Vec<(ProductId, i64)>, StockError> {
    let mut totals: Vec<(ProductId, i64)> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(StockError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        match totals.iter_mut().find(|(id, _)| *id == line.product_id) {
            Some((_, qty)) => {
                *qty = qty
                    .checked_add(line.quantity)
                    .ok_or(StockError::Overflow(line.product_id))?;
            }
            None => totals.push((line.product_id, line.quantity)),
        }
    }
    Ok(totals)
}

/// Plan the stock increase for received goods.
pub fn plan_receipt(
    levels: &HashMap<ProductId, i64>,
    lines: &[StockLine],
) -> Result<Vec<StockChange>, StockError> {
    aggregate(lines)?
        .into_iter()
        .map(|(product_id, qty)| {
            let before = *levels
                .get(&product_id)
                .ok_or(StockError::UnknownProduct(product_id))?;
            let after = before
                .checked_add(qty)
                .ok_or(StockError::Overflow(product_id))?;
            Ok(StockChange {
                product_id,
                before,
                after,
            })
        })
        .collect()
}

/// Plan the stock decrease for issued goods (or for reversing a receipt).
///
/// Fails on the first product whose aggregated requested quantity exceeds
/// what is on hand; no partial plan is returned.
pub fn plan_issue(
    levels: &HashMap<ProductId, i64>,
    lines: &[StockLine],
) -> Result<Vec<StockChange>, StockError> {
    aggregate(lines)?
        .into_iter()
        .map(|(product_id, requested)| {
            let available = *levels
                .get(&product_id)
                .ok_or(StockError::UnknownProduct(product_id))?;
            if available < requested {
                return Err(StockError::Insufficient {
                    product_id,
                    available,
                    requested,
                });
            }
            Ok(StockChange {
                product_id,
                before: available,
                after: available - requested,
            })
        })
        .collect()
}
