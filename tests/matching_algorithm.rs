//! Cross-cutting matching scenarios exercised through the public crate
//! API, complementing the pure-function unit tests colocated with
//! `matching::algorithm`.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use spotmatch_core::matching::run_match;
use spotmatch_core::models::kline::Kline;
use spotmatch_core::models::order::Order;
use spotmatch_core::models::side::{OrderStatus, OrderType, Side};
use uuid::Uuid;

fn order(side: Side, order_type: OrderType, price: Decimal, qty: Decimal, offset_ms: i64) -> Order {
    let base = Utc::now();
    let created_at = base + chrono::Duration::milliseconds(offset_ms);
    Order {
        id: Uuid::new_v4(),
        user_id: 1,
        symbol: "BTC-USDT".into(),
        side,
        order_type,
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

/// A buy sweeping three price levels in one cycle must exhaust them in
/// price order and leave the deepest level partially filled.
#[test]
fn buy_sweeps_multiple_price_levels_in_order() {
    let s1 = order(Side::Sell, OrderType::Limit, dec!(100), dec!(1), 0);
    let s2 = order(Side::Sell, OrderType::Limit, dec!(101), dec!(1), 1);
    let s3 = order(Side::Sell, OrderType::Limit, dec!(102), dec!(5), 2);
    let b1 = order(Side::Buy, OrderType::Limit, dec!(102), dec!(4), 3);

    let outcome = run_match(vec![b1.clone()], vec![s1.clone(), s2.clone(), s3.clone()], Utc::now()).unwrap();

    assert_eq!(outcome.trades.len(), 3);
    assert_eq!(outcome.trades[0].price, dec!(100));
    assert_eq!(outcome.trades[1].price, dec!(101));
    assert_eq!(outcome.trades[2].price, dec!(102));
    assert_eq!(outcome.trades[2].quantity, dec!(2));

    let s3_touched = outcome.touched.iter().find(|o| o.id == s3.id).unwrap();
    assert_eq!(s3_touched.status, OrderStatus::PartiallyFilled);
    assert_eq!(s3_touched.remaining_qty(), dec!(3));
}

/// MARKET orders reach the algorithm already priced at their caller's
/// worst acceptable bound (spec's order-admission contract); the
/// algorithm itself must not distinguish order types when crossing.
#[test]
fn market_order_priced_as_worst_bound_crosses_like_a_limit() {
    let s1 = order(Side::Sell, OrderType::Limit, dec!(100), dec!(2), 0);
    let market_buy = order(Side::Buy, OrderType::Market, dec!(1_000_000), dec!(2), 1);

    let outcome = run_match(vec![market_buy.clone()], vec![s1.clone()], Utc::now()).unwrap();

    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].price, dec!(100), "execution price is always the resting sell's price");
    let buy_touched = outcome.touched.iter().find(|o| o.id == market_buy.id).unwrap();
    assert_eq!(buy_touched.status, OrderStatus::Filled);
}

/// Self-trade prevention is not part of this core (no such invariant in
/// the data model) — two orders from the same user must still cross.
#[test]
fn same_user_orders_still_cross() {
    let mut b1 = order(Side::Buy, OrderType::Limit, dec!(100), dec!(1), 0);
    let mut s1 = order(Side::Sell, OrderType::Limit, dec!(100), dec!(1), 1);
    b1.user_id = 42;
    s1.user_id = 42;

    let outcome = run_match(vec![b1], vec![s1], Utc::now()).unwrap();
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].buyer_user_id, 42);
    assert_eq!(outcome.trades[0].seller_user_id, 42);
}

/// A multi-level cycle's trade set folds into a single kline bucket
/// exactly like a single trade would, exercising the C3 -> C4 boundary
/// the cycle wires together at the data-shape level.
#[test]
fn cycle_trade_output_folds_into_one_kline() {
    let s1 = order(Side::Sell, OrderType::Limit, dec!(100), dec!(1), 0);
    let s2 = order(Side::Sell, OrderType::Limit, dec!(101), dec!(1), 1);
    let b1 = order(Side::Buy, OrderType::Limit, dec!(101), dec!(2), 2);

    let now = Utc::now();
    let outcome = run_match(vec![b1], vec![s1, s2], now).unwrap();
    assert_eq!(outcome.trades.len(), 2);

    let (open_time, close_time) = spotmatch_core::kline::align::bucket_for(spotmatch_core::models::side::Interval::OneMinute, now);
    let mut kline: Option<Kline> = None;
    for trade in &outcome.trades {
        kline = Some(match kline {
            None => Kline::seed(trade.symbol.clone(), spotmatch_core::models::side::Interval::OneMinute, open_time, close_time, trade.price, trade.quantity),
            Some(mut k) => {
                k.fold(trade.price, trade.quantity);
                k
            }
        });
    }
    let kline = kline.unwrap();
    assert_eq!(kline.trade_count, 2);
    assert_eq!(kline.open, dec!(100));
    assert_eq!(kline.close, dec!(101));
    assert_eq!(kline.base_volume, dec!(2));
}

/// All trades produced by one cycle share `created_at`; their ids must
/// still sort ascending in the order they were generated, so a replay
/// that re-sorts persisted trades by `(created_at, id)` reconstructs the
/// same fold order the live cycle used.
#[test]
fn trade_ids_within_one_cycle_sort_in_insertion_order() {
    let s1 = order(Side::Sell, OrderType::Limit, dec!(100), dec!(1), 0);
    let s2 = order(Side::Sell, OrderType::Limit, dec!(101), dec!(1), 1);
    let s3 = order(Side::Sell, OrderType::Limit, dec!(102), dec!(1), 2);
    let b1 = order(Side::Buy, OrderType::Limit, dec!(102), dec!(3), 3);

    let now = Utc::now();
    let outcome = run_match(vec![b1], vec![s1, s2, s3], now).unwrap();
    assert_eq!(outcome.trades.len(), 3);

    let mut sorted_by_id = outcome.trades.clone();
    sorted_by_id.sort_by_key(|t| t.id);
    let insertion_order: Vec<Decimal> = outcome.trades.iter().map(|t| t.price).collect();
    let id_order: Vec<Decimal> = sorted_by_id.iter().map(|t| t.price).collect();
    assert_eq!(insertion_order, id_order);
}
