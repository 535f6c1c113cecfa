//! Quote totals calculation.
//!
//! Totals are persisted with the quote and shown again in exports, so the
//! rounding rule here is part of the stored data format: tax is the subtotal
//! times 21%, rounded half away from zero to two decimals.

use crate::{
    entities::LineItem,
    errors::{Error, Result},
};
use rust_decimal::{Decimal, RoundingStrategy};

/// Fixed VAT rate applied to every quote (21%).
pub const TAX_RATE: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

/// Subtotal, tax and total of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteTotals {
    /// Sum of quantity × unit price over all items
    pub subtotal: Decimal,
    /// `round(subtotal × 0.21, 2)`
    pub tax: Decimal,
    /// `subtotal + tax`
    pub total: Decimal,
}

/// Computes subtotal, tax and total for a list of line items.
#[must_use]
pub fn compute_totals(items: &[LineItem]) -> QuoteTotals {
    let subtotal: Decimal = items
        .iter()
        .map(|item| item.quantity * item.unit_price)
        .sum();
    let tax = (subtotal * TAX_RATE).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    QuoteTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

/// Rejects line items that cannot be priced.
///
/// Descriptions must be non-blank, quantities strictly positive and unit
/// prices non-negative.
pub fn validate_line_items(items: &[LineItem]) -> Result<()> {
    for (index, item) in items.iter().enumerate() {
        let line = index + 1;
        if item.description.trim().is_empty() {
            return Err(Error::InvalidLineItem {
                reason: format!("line {line} has an empty description"),
            });
        }
        if item.quantity <= Decimal::ZERO {
            return Err(Error::InvalidLineItem {
                reason: format!("line {line} has quantity {}", item.quantity),
            });
        }
        if item.unit_price < Decimal::ZERO {
            return Err(Error::InvalidLineItem {
                reason: format!("line {line} has negative unit price {}", item.unit_price),
            });
        }
    }
    Ok(())
}
