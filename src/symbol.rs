//! Trading pair (symbol) contract.
//!
//! The full symbol registry (creation, activation, chain mapping) is an
//! external collaborator's concern; the matching core only needs enough
//! of its shape to validate admitted orders and to know whether a
//! symbol is currently active for matching.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Symbol {
    pub symbol: String,
    pub is_active: bool,
    /// Minimum price increment.
    pub tick_size: Decimal,
    /// Minimum quantity increment.
    pub step_size: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub min_qty: Decimal,
    pub max_qty: Decimal,
}

impl Symbol {
    /// Checks price/quantity against tick/step size and min/max bounds:
    /// price must be positive and a multiple of the tick size, quantity a
    /// multiple of the step size, and both within the symbol's bounds.
    pub fn validate_order(&self, price: Decimal, qty: Decimal) -> Result<(), String> {
        if price <= Decimal::ZERO {
            return Err("price must be positive".into());
        }
        if price < self.min_price || price > self.max_price {
            return Err(format!("price {price} outside [{}, {}]", self.min_price, self.max_price));
        }
        if qty < self.min_qty || qty > self.max_qty {
            return Err(format!("quantity {qty} outside [{}, {}]", self.min_qty, self.max_qty));
        }
        if !is_multiple_of(price, self.tick_size) {
            return Err(format!("price {price} does not conform to tick size {}", self.tick_size));
        }
        if !is_multiple_of(qty, self.step_size) {
            return Err(format!("quantity {qty} does not conform to step size {}", self.step_size));
        }
        Ok(())
    }
}

fn is_multiple_of(value: Decimal, increment: Decimal) -> bool {
    if increment <= Decimal::ZERO {
        return true;
    }
    (value / increment).fract() == Decimal::ZERO
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_usdt() -> Symbol {
        Symbol {
            symbol: "BTC-USDT".into(),
            is_active: true,
            tick_size: dec!(0.01),
            step_size: dec!(0.0001),
            min_price: dec!(1),
            max_price: dec!(1000000),
            min_qty: dec!(0.0001),
            max_qty: dec!(1000),
        }
    }

    #[test]
    fn accepts_conforming_order() {
        assert!(btc_usdt().validate_order(dec!(50000.01), dec!(0.5)).is_ok());
    }

    #[test]
    fn rejects_tick_misalignment() {
        assert!(btc_usdt().validate_order(dec!(50000.001), dec!(0.5)).is_err());
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(btc_usdt().validate_order(dec!(0), dec!(0.5)).is_err());
    }
}
