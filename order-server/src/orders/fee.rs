//! Delivery fee and tax policy
//!
//! Pure functions of subtotal and order type; no side effects, no errors.

use super::money::{round_money, to_decimal};
use rust_decimal::Decimal;
use shared::order::OrderType;

/// Fee and tax configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePolicy {
    /// Delivery subtotal at or above which delivery is free
    pub free_threshold: Decimal,
    /// Flat delivery fee below the threshold
    pub delivery_fee: Decimal,
    /// Tax rate applied to the subtotal (delivery fee is not taxed)
    pub tax_rate: Decimal,
}

impl FeePolicy {
    pub fn new(free_threshold: f64, delivery_fee: f64, tax_rate: f64) -> Self {
        Self {
            free_threshold: to_decimal(free_threshold),
            delivery_fee: to_decimal(delivery_fee),
            tax_rate: to_decimal(tax_rate),
        }
    }

    /// Delivery fee for a subtotal
    ///
    /// - pickup: 0
    /// - delivery at or above the free threshold: 0
    /// - delivery below the threshold: flat fee
    pub fn compute_fee(&self, subtotal: Decimal, order_type: OrderType) -> Decimal {
        match order_type {
            OrderType::Pickup => Decimal::ZERO,
            OrderType::Delivery if subtotal >= self.free_threshold => Decimal::ZERO,
            OrderType::Delivery => self.delivery_fee,
        }
    }

    /// `round_half_up(subtotal × taxRate, 2)`
    pub fn compute_tax(&self, subtotal: Decimal) -> Decimal {
        round_money(subtotal * self.tax_rate)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(50.0, 4.99, 0.08)
    }
}
