use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{JobId, OrderId, Symbol, UserId};
use crate::models::side::{OrderStatus, OrderType, Side};

/// A resting or historical order.
///
/// Mutated only by the Matching Engine or by an explicit user cancel;
/// never deleted. Invariants enforced in code live in `Order::apply_fill`
/// and `matching::algorithm`; the rest are store-level constraints
/// (`store::orders::PgOrderStore`'s schema/queries).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Decimal,
    pub original_qty: Decimal,
    pub executed_qty: Decimal,
    pub status: OrderStatus,
    pub is_working: bool,
    pub is_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locking_job_id: Option<JobId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Quantity still eligible to match.
    pub fn remaining_qty(&self) -> Decimal {
        self.original_qty - self.executed_qty
    }

    pub fn is_filled(&self) -> bool {
        self.executed_qty >= self.original_qty
    }

    /// Applies a fill of `qty` and recomputes status/is_working.
    ///
    /// Panics are never used here: a caller that fills past `original_qty`
    /// gets back an explicit `CoreError::InvariantViolation` so the
    /// matching cycle can fail cleanly instead of corrupting state.
    pub fn apply_fill(&mut self, qty: Decimal, now: DateTime<Utc>) -> Result<(), crate::error::CoreError> {
        if qty <= Decimal::ZERO {
            return Err(crate::error::CoreError::InvariantViolation(format!(
                "non-positive fill quantity {qty} for order {}",
                self.id
            )));
        }
        let new_executed = self.executed_qty + qty;
        if new_executed > self.original_qty {
            return Err(crate::error::CoreError::InvariantViolation(format!(
                "overfill: order {} executed {new_executed} exceeds original {}",
                self.id, self.original_qty
            )));
        }
        self.executed_qty = new_executed;
        if self.is_filled() {
            self.status = OrderStatus::Filled;
            self.is_working = false;
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
        self.updated_at = now;
        Ok(())
    }

    /// The sort key used when reading the active book for one side:
    /// `(price, created_at, id)`. Buys sort this descending on price,
    /// sells ascending; both sort created_at/id ascending as the tie
    /// break, so a replay of the same book always matches identically.
    pub fn sort_key(&self) -> (Decimal, DateTime<Utc>, OrderId) {
        (self.price, self.created_at, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new_v4(),
            user_id: 1,
            symbol: "BTC-USDT".into(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: dec!(100),
            original_qty: dec!(5),
            executed_qty: dec!(0),
            status: OrderStatus::New,
            is_working: true,
            is_locked: false,
            locked_at: None,
            locking_job_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn partial_fill_keeps_working() {
        let mut o = sample_order();
        o.apply_fill(dec!(2), Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::PartiallyFilled);
        assert!(o.is_working);
        assert_eq!(o.remaining_qty(), dec!(3));
    }

    #[test]
    fn full_fill_stops_working() {
        let mut o = sample_order();
        o.apply_fill(dec!(5), Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::Filled);
        assert!(!o.is_working);
        assert_eq!(o.remaining_qty(), dec!(0));
    }

    #[test]
    fn overfill_is_rejected() {
        let mut o = sample_order();
        let err = o.apply_fill(dec!(10), Utc::now()).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::InvariantViolation(_)));
    }
}
