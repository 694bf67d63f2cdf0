//! The pure, in-memory matching algorithm: price-time priority matching
//! of a buy book against a sell book.
//!
//! Deliberately free of I/O and async: it takes already-sorted books and
//! returns trades plus the set of orders it touched. That makes it
//! trivially unit-testable and gives a hard guarantee for free — this
//! function never suspends, so its running time is deterministic for a
//! given batch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use ulid::Ulid;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::order::Order;
use crate::models::trade::Trade;

/// Builds the next trade id for this run: a ULID seeded with the cycle's
/// `now` and a strictly increasing sequence number, so that two trades
/// sharing a `created_at` within one cycle still sort id-ascending in
/// insertion order. Stored in the UUID column as the ULID's raw 128 bits.
fn next_trade_id(now: DateTime<Utc>, seq: u32) -> Uuid {
    let ulid = Ulid::from_parts(now.timestamp_millis() as u64, seq as u128);
    Uuid::from_u128(u128::from(ulid))
}

/// Output of one run of the algorithm.
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    /// Orders whose executed_qty/status/is_working changed, in no
    /// particular order, deduplicated by id.
    pub touched: Vec<Order>,
}

/// Runs the price-time priority match of `buys` against `sells`.
///
/// `buys` must already be sorted price-desc, created_at-asc, id-asc;
/// `sells` price-asc, created_at-asc, id-asc — this is the responsibility
/// of the caller (the Order Store's `get_active_*_orders` queries), not
/// of this function, so the same sort discipline is exercised by the
/// store's SQL `ORDER BY` and by the pure algorithm's test fixtures.
///
/// Execution price is always the resting sell's price, and
/// `is_buyer_maker` is always `false` — both are deliberately kept as
/// the system's intended (if maker/taker-naive) behavior rather than
/// "corrected" to a maker/taker-aware price; see DESIGN.md.
pub fn run_match(mut buys: Vec<Order>, mut sells: Vec<Order>, now: DateTime<Utc>) -> Result<MatchOutcome, CoreError> {
    let mut trades = Vec::new();
    let mut touched_ids = std::collections::HashSet::new();
    let mut touched = Vec::new();
    let mut trade_seq: u32 = 0;

    let mut sell_idx_start = 0usize;

    for b in buys.iter_mut() {
        if b.remaining_qty() == Decimal::ZERO {
            continue;
        }
        let mut s_idx = sell_idx_start;
        while s_idx < sells.len() {
            let s = &mut sells[s_idx];
            if s.remaining_qty() == Decimal::ZERO {
                s_idx += 1;
                continue;
            }
            if b.price < s.price {
                // No further sell in price order can cross this buy.
                break;
            }

            let q = b.remaining_qty().min(s.remaining_qty());
            let exec_price = s.price;

            if q <= Decimal::ZERO {
                return Err(CoreError::InvariantViolation(format!(
                    "non-positive match quantity between buy {} and sell {}",
                    b.id, s.id
                )));
            }
            if exec_price < s.price || exec_price > b.price {
                return Err(CoreError::InvariantViolation(
                    "execution price outside [sell.price, buy.price]".into(),
                ));
            }

            trades.push(Trade {
                id: next_trade_id(now, trade_seq),
                symbol: b.symbol.clone(),
                buyer_order_id: b.id,
                seller_order_id: s.id,
                buyer_user_id: b.user_id,
                seller_user_id: s.user_id,
                price: exec_price,
                quantity: q,
                is_buyer_maker: false,
                created_at: now,
            });
            trade_seq += 1;

            b.apply_fill(q, now)?;
            s.apply_fill(q, now)?;

            if touched_ids.insert(b.id) {
                touched.push(b.clone());
            } else if let Some(existing) = touched.iter_mut().find(|o: &&mut Order| o.id == b.id) {
                *existing = b.clone();
            }
            if touched_ids.insert(s.id) {
                touched.push(s.clone());
            } else if let Some(existing) = touched.iter_mut().find(|o: &&mut Order| o.id == s.id) {
                *existing = s.clone();
            }

            if s.remaining_qty() == Decimal::ZERO {
                s_idx += 1;
            }
            if b.remaining_qty() == Decimal::ZERO {
                break;
            }
        }
        sell_idx_start = s_idx;
    }

    Ok(MatchOutcome { trades, touched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::side::{OrderStatus, OrderType, Side};
    use rust_decimal_macros::dec;
    use std::time::Duration as StdDuration;

    fn order(side: Side, price: Decimal, qty: Decimal, created_offset_ms: i64) -> Order {
        let base = Utc::now();
        let created_at = base + chrono::Duration::milliseconds(created_offset_ms);
        Order {
            id: Uuid::new_v4(),
            user_id: 1,
            symbol: "BTC-USDT".into(),
            side,
            order_type: OrderType::Limit,
            price,
            original_qty: qty,
            executed_qty: Decimal::ZERO,
            status: OrderStatus::New,
            is_working: true,
            is_locked: false,
            locked_at: None,
            locking_job_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn scenario_a_single_full_cross() {
        let b1 = order(Side::Buy, dec!(100), dec!(5), 0);
        let s1 = order(Side::Sell, dec!(99), dec!(5), 1);
        let outcome = run_match(vec![b1.clone()], vec![s1.clone()], Utc::now()).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let t = &outcome.trades[0];
        assert_eq!(t.price, dec!(99));
        assert_eq!(t.quantity, dec!(5));
        assert_eq!(t.buyer_order_id, b1.id);
        assert_eq!(t.seller_order_id, s1.id);
        assert!(!t.is_buyer_maker);

        let touched_b = outcome.touched.iter().find(|o| o.id == b1.id).unwrap();
        let touched_s = outcome.touched.iter().find(|o| o.id == s1.id).unwrap();
        assert_eq!(touched_b.status, OrderStatus::Filled);
        assert_eq!(touched_s.status, OrderStatus::Filled);
    }

    #[test]
    fn scenario_b_time_priority_tie_break() {
        let s1 = order(Side::Sell, dec!(100), dec!(1), 0);
        std::thread::sleep(StdDuration::from_millis(1));
        let s2 = order(Side::Sell, dec!(100), dec!(1), 5);
        let b1 = order(Side::Buy, dec!(100), dec!(1), 10);

        let outcome = run_match(vec![b1], vec![s1.clone(), s2.clone()], Utc::now()).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].seller_order_id, s1.id);
        let s2_touched = outcome.touched.iter().find(|o| o.id == s2.id);
        assert!(s2_touched.is_none(), "later order at same price must be untouched");
    }

    #[test]
    fn scenario_c_partial_fill_cascade() {
        let s1 = order(Side::Sell, dec!(100), dec!(2), 0);
        let s2 = order(Side::Sell, dec!(101), dec!(3), 1);
        let b1 = order(Side::Buy, dec!(101), dec!(4), 2);

        let outcome = run_match(vec![b1.clone()], vec![s1.clone(), s2.clone()], Utc::now()).unwrap();
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price, dec!(100));
        assert_eq!(outcome.trades[0].quantity, dec!(2));
        assert_eq!(outcome.trades[1].price, dec!(101));
        assert_eq!(outcome.trades[1].quantity, dec!(2));

        let b1_touched = outcome.touched.iter().find(|o| o.id == b1.id).unwrap();
        assert_eq!(b1_touched.status, OrderStatus::Filled);
        assert_eq!(b1_touched.executed_qty, dec!(4));

        let s1_touched = outcome.touched.iter().find(|o| o.id == s1.id).unwrap();
        assert_eq!(s1_touched.status, OrderStatus::Filled);

        let s2_touched = outcome.touched.iter().find(|o| o.id == s2.id).unwrap();
        assert_eq!(s2_touched.status, OrderStatus::PartiallyFilled);
        assert_eq!(s2_touched.executed_qty, dec!(2));
    }

    #[test]
    fn scenario_d_non_cross_produces_nothing() {
        let b1 = order(Side::Buy, dec!(99), dec!(1), 0);
        let s1 = order(Side::Sell, dec!(100), dec!(1), 1);
        let outcome = run_match(vec![b1], vec![s1], Utc::now()).unwrap();
        assert!(outcome.trades.is_empty());
        assert!(outcome.touched.is_empty());
    }

    #[test]
    fn exact_price_match_fills_both_fully() {
        let b1 = order(Side::Buy, dec!(100), dec!(5), 0);
        let s1 = order(Side::Sell, dec!(100), dec!(5), 1);
        let outcome = run_match(vec![b1.clone()], vec![s1.clone()], Utc::now()).unwrap();
        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, dec!(100));
    }

    #[test]
    fn buy_smaller_than_smallest_sell_leaves_sell_partial() {
        let b1 = order(Side::Buy, dec!(100), dec!(1), 0);
        let s1 = order(Side::Sell, dec!(100), dec!(5), 1);
        let outcome = run_match(vec![b1.clone()], vec![s1.clone()], Utc::now()).unwrap();
        let b_touched = outcome.touched.iter().find(|o| o.id == b1.id).unwrap();
        let s_touched = outcome.touched.iter().find(|o| o.id == s1.id).unwrap();
        assert_eq!(b_touched.status, OrderStatus::Filled);
        assert_eq!(s_touched.status, OrderStatus::PartiallyFilled);
    }

    #[test]
    fn empty_side_produces_no_trades() {
        let b1 = order(Side::Buy, dec!(100), dec!(1), 0);
        let outcome = run_match(vec![b1], vec![], Utc::now()).unwrap();
        assert!(outcome.trades.is_empty());
    }

    #[test]
    fn replay_is_deterministic() {
        let b1 = order(Side::Buy, dec!(101), dec!(4), 2);
        let s1 = order(Side::Sell, dec!(100), dec!(2), 0);
        let s2 = order(Side::Sell, dec!(101), dec!(3), 1);

        let a = run_match(vec![b1.clone()], vec![s1.clone(), s2.clone()], Utc::now()).unwrap();
        let b = run_match(vec![b1], vec![s1, s2], Utc::now()).unwrap();

        assert_eq!(a.trades.len(), b.trades.len());
        for (ta, tb) in a.trades.iter().zip(b.trades.iter()) {
            assert_eq!(ta.price, tb.price);
            assert_eq!(ta.quantity, tb.quantity);
            assert_eq!(ta.buyer_order_id, tb.buyer_order_id);
            assert_eq!(ta.seller_order_id, tb.seller_order_id);
        }
    }
}
