//! # Stock Rules
//!
//! Pure checks used by the stock ledger before and after it touches
//! `products.quantity`. The ledger itself (reserve/restore) lives in
//! `shopdesk-db`, where the check and the decrement run as one statement.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::Product;

/// User-facing wording for a shortage.
pub fn shortage_message(product: &str, available: i64) -> String {
    if available <= 0 {
        format!("Stock unavailable for {}.", product)
    } else {
        format!(
            "Insufficient stock for {}. Only {} units available.",
            product, available
        )
    }
}

/// Checks that `requested` units can be taken from `product`.
pub fn ensure_available(product: &Product, requested: i64) -> CoreResult<()> {
    if requested > product.quantity {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.quantity.max(0),
            requested,
        });
    }
    Ok(())
}

/// Validates a manual stock adjustment and returns the new quantity.
///
/// Adjustments (receiving, shrinkage) may be negative but cannot take the
/// product below zero.
pub fn apply_adjustment(product: &Product, delta: i64) -> CoreResult<i64> {
    let next = product
        .quantity
        .checked_add(delta)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        })?;

    if next < 0 {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            available: product.quantity,
            requested: -delta,
        });
    }
    Ok(next)
}
