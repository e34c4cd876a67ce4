//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization. Amounts are computed once, at creation, and
//! never re-derived.

use super::fee::FeePolicy;
use rust_decimal::prelude::*;
use shared::order::{OrderAmounts, OrderItem, OrderType};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round to cents, half-up
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

/// `price × quantity`, unrounded
pub fn line_total(item: &OrderItem) -> Decimal {
    to_decimal(item.price) * Decimal::from(item.quantity.max(0))
}

/// Sum of line totals, rounded to cents
pub fn calculate_subtotal(items: &[OrderItem]) -> Decimal {
    round_money(items.iter().map(line_total).sum())
}

/// Subtotal, tax, delivery fee and total for a validated order
///
/// `total == subtotal + tax + deliveryFee` holds exactly in `Decimal`; each
/// field is already at two decimal places, so the `f64` projection is the
/// nearest double of an exact cent amount.
pub fn calculate_amounts(items: &[OrderItem], order_type: OrderType, policy: &FeePolicy) -> OrderAmounts {
    let subtotal = calculate_subtotal(items);
    let tax = policy.compute_tax(subtotal);
    let delivery_fee = policy.compute_fee(subtotal, order_type);
    let total = subtotal + tax + delivery_fee;

    OrderAmounts {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        delivery_fee: to_f64(delivery_fee),
        total: to_f64(total),
    }
}

/// Re-check the total invariant of stored amounts at cent precision
pub fn amounts_consistent(amounts: &OrderAmounts) -> bool {
    let expected = to_decimal(amounts.subtotal) + to_decimal(amounts.tax) + to_decimal(amounts.delivery_fee);
    round_money(expected) == round_money(to_decimal(amounts.total))
}
