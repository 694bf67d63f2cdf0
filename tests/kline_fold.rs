//! End-to-end fold correctness against a real `KlineStore` implementor,
//! plus the fold-associativity-under-ordered-input property from the
//! kline aggregator's testable properties list.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use spotmatch_core::core_types::Symbol;
use spotmatch_core::error::CoreError;
use spotmatch_core::kline::{fold_trades, regenerate_bucket, KlineStore};
use spotmatch_core::models::kline::Kline;
use spotmatch_core::models::side::Interval;
use spotmatch_core::models::trade::Trade;
use spotmatch_core::publisher::LoggingPublisher;
use uuid::Uuid;

/// Minimal in-memory `KlineStore`, keyed the same way the Postgres
/// implementation's composite primary key is.
#[derive(Default)]
struct InMemoryKlineStore {
    rows: Mutex<HashMap<(Symbol, &'static str, DateTime<Utc>), Kline>>,
}

#[async_trait]
impl KlineStore for InMemoryKlineStore {
    async fn load(&self, symbol: &str, interval: Interval, open_time: DateTime<Utc>) -> Result<Option<Kline>, CoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(symbol.to_string(), interval.as_str(), open_time)).cloned())
    }

    async fn upsert(&self, kline: &Kline) -> Result<(), CoreError> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert((kline.symbol.clone(), kline.interval.as_str(), kline.open_time), kline.clone());
        Ok(())
    }

    async fn recent(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Kline>, CoreError> {
        let rows = self.rows.lock().unwrap();
        let mut matches: Vec<Kline> = rows
            .values()
            .filter(|k| k.symbol == symbol && k.interval.as_str() == interval.as_str())
            .cloned()
            .collect();
        matches.sort_by_key(|k| std::cmp::Reverse(k.open_time));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn active_symbols(&self) -> Result<Vec<Symbol>, CoreError> {
        let rows = self.rows.lock().unwrap();
        let mut symbols: Vec<Symbol> = rows.keys().map(|(s, _, _)| s.clone()).collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

fn trade(symbol: &str, price: rust_decimal::Decimal, qty: rust_decimal::Decimal, at: DateTime<Utc>) -> Trade {
    Trade {
        id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        buyer_order_id: Uuid::new_v4(),
        seller_order_id: Uuid::new_v4(),
        buyer_user_id: 1,
        seller_user_id: 2,
        price,
        quantity: qty,
        is_buyer_maker: false,
        created_at: at,
    }
}

#[tokio::test]
async fn folding_three_trades_produces_correct_ohlcv() {
    let store = InMemoryKlineStore::default();
    let publisher = LoggingPublisher;

    let t0 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 5).unwrap();
    let t1 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 15).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 45).unwrap();

    let trades = vec![
        trade("BTC-USDT", dec!(100), dec!(1), t0),
        trade("BTC-USDT", dec!(105), dec!(2), t1),
        trade("BTC-USDT", dec!(95), dec!(1), t2),
    ];

    fold_trades(&store, &publisher, &trades).await.unwrap();

    let (open_time, _) = spotmatch_core::kline::align::bucket_for(Interval::OneMinute, t0);
    let kline = store.load("BTC-USDT", Interval::OneMinute, open_time).await.unwrap().unwrap();

    assert_eq!(kline.open, dec!(100));
    assert_eq!(kline.close, dec!(95));
    assert_eq!(kline.high, dec!(105));
    assert_eq!(kline.low, dec!(95));
    assert_eq!(kline.base_volume, dec!(4));
    assert_eq!(kline.trade_count, 3);
}

#[tokio::test]
async fn trades_in_different_buckets_do_not_cross_contaminate() {
    let store = InMemoryKlineStore::default();
    let publisher = LoggingPublisher;

    let minute_one = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 30).unwrap();
    let minute_two = Utc.with_ymd_and_hms(2026, 3, 5, 10, 1, 30).unwrap();

    let trades = vec![
        trade("BTC-USDT", dec!(100), dec!(1), minute_one),
        trade("BTC-USDT", dec!(200), dec!(1), minute_two),
    ];
    fold_trades(&store, &publisher, &trades).await.unwrap();

    let (open_one, _) = spotmatch_core::kline::align::bucket_for(Interval::OneMinute, minute_one);
    let (open_two, _) = spotmatch_core::kline::align::bucket_for(Interval::OneMinute, minute_two);

    let k1 = store.load("BTC-USDT", Interval::OneMinute, open_one).await.unwrap().unwrap();
    let k2 = store.load("BTC-USDT", Interval::OneMinute, open_two).await.unwrap().unwrap();

    assert_eq!(k1.trade_count, 1);
    assert_eq!(k2.trade_count, 1);
    assert_eq!(k1.close, dec!(100));
    assert_eq!(k2.close, dec!(200));
}

/// Fold associativity under ordered input: folding trades one at a time
/// through the live store must produce the same bucket as folding the
/// same ordered sequence in a single pure `regenerate_bucket` pass —
/// the incremental path and the backfill/recovery path must agree.
#[tokio::test]
async fn incremental_fold_matches_pure_regeneration() {
    let store = InMemoryKlineStore::default();
    let publisher = LoggingPublisher;

    let t0 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 1).unwrap();
    let t1 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 20).unwrap();
    let t2 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 40).unwrap();

    let trades = vec![
        trade("ETH-USDT", dec!(10), dec!(3), t0),
        trade("ETH-USDT", dec!(12), dec!(1), t1),
        trade("ETH-USDT", dec!(9), dec!(4), t2),
    ];

    fold_trades(&store, &publisher, &trades).await.unwrap();
    let (open_time, _) = spotmatch_core::kline::align::bucket_for(Interval::OneMinute, t0);
    let incremental = store.load("ETH-USDT", Interval::OneMinute, open_time).await.unwrap().unwrap();

    let regenerated = regenerate_bucket("ETH-USDT", Interval::OneMinute, t0, &trades).unwrap();

    assert_eq!(incremental.open, regenerated.open);
    assert_eq!(incremental.high, regenerated.high);
    assert_eq!(incremental.low, regenerated.low);
    assert_eq!(incremental.close, regenerated.close);
    assert_eq!(incremental.base_volume, regenerated.base_volume);
    assert_eq!(incremental.quote_volume, regenerated.quote_volume);
    assert_eq!(incremental.trade_count, regenerated.trade_count);
}
