//! Derived stock status.
//!
//! [`stock_status`] is the single source of truth for an item's
//! classification. The serializer's status characters and the low-stock
//! filters both go through it, so a document on disk never disagrees with
//! what a caller derives.

use crate::model::{ItemRecord, Quantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockStatus {
    Normal,
    Warning,
    Out,
    InStock,
}

/// Classify an item. Rules apply in order:
/// flags map directly to `InStock`/`Out`; a non-positive amount is `Out`;
/// a positive minimum at or above the amount is `Warning`; otherwise
/// `Normal`.
pub fn stock_status(item: &ItemRecord) -> StockStatus {
    match &item.quantity {
        Quantity::Flag { in_stock } => {
            if *in_stock {
                StockStatus::InStock
            } else {
                StockStatus::Out
            }
        }
        Quantity::Measured {
            amount, minimum, ..
        } => {
            if *amount <= 0.0 {
                StockStatus::Out
            } else if matches!(minimum, Some(min) if *min > 0.0 && *amount <= *min) {
                StockStatus::Warning
            } else {
                StockStatus::Normal
            }
        }
    }
}
