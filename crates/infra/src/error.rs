use thiserror::Error;

use stockroom_core::{DomainError, ProductId};
use stockroom_inventory::StockError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-level error.
///
/// Domain failures raised while applying a change are carried through so the
/// API can map them precisely.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(DomainError),

    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<DomainError> for StoreError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound { entity } => StoreError::NotFound { entity },
            DomainError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Domain(other),
        }
    }
}

impl From<StockError> for StoreError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::UnknownProduct(_) => StoreError::not_found("product"),
            StockError::Insufficient {
                product_id,
                available,
                requested,
            } => StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            StockError::InvalidQuantity { .. } => {
                StoreError::Domain(DomainError::validation("quantity", e.to_string()))
            }
            StockError::Overflow(_) => StoreError::Domain(DomainError::invariant(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_not_found_and_conflict_are_lifted() {
        assert!(matches!(
            StoreError::from(DomainError::not_found("supplier")),
            StoreError::NotFound { entity: "supplier" }
        ));
        assert!(matches!(
            StoreError::from(DomainError::conflict("dup")),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            StoreError::from(DomainError::validation("name", "empty")),
            StoreError::Domain(_)
        ));
    }

    #[test]
    fn stock_shortage_keeps_quantities() {
        let id = ProductId::new();
        let e = StoreError::from(StockError::Insufficient {
            product_id: id,
            available: 2,
            requested: 5,
        });
        assert!(matches!(
            e,
            StoreError::InsufficientStock { product_id, available: 2, requested: 5 } if product_id == id
        ));
    }
}
