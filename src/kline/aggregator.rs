//! Incremental fold: a per-trade OHLCV update, fanned out across every
//! supported interval, plus backfill/regeneration from a trade range.

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::kline::align::bucket_for;
use crate::kline::store::KlineStore;
use crate::models::kline::Kline;
use crate::models::side::Interval;
use crate::models::trade::Trade;
use crate::publisher::EventPublisher;

/// Folds one trade into every supported interval's current bucket and
/// upserts + publishes each. Trades within a cycle MUST be presented in
/// the order the caller wants folded — this function does not reorder,
/// and the fold is order-sensitive (high/low/close depend on sequence).
pub async fn fold_trade(store: &dyn KlineStore, publisher: &dyn EventPublisher, trade: &Trade) -> Result<(), CoreError> {
    for interval in Interval::ALL {
        let (open_time, close_time) = bucket_for(interval, trade.created_at);
        let existing = store.load(&trade.symbol, interval, open_time).await?;

        let kline = match existing {
            Some(mut k) => {
                k.close_time = close_time;
                k.fold(trade.price, trade.quantity);
                k
            }
            None => Kline::seed(trade.symbol.clone(), interval, open_time, close_time, trade.price, trade.quantity),
        };

        store.upsert(&kline).await?;
        publisher.publish_kline_update(&kline).await;
    }
    Ok(())
}

/// Folds an already-ordered slice of trades, one at a time. Callers must
/// have sorted by `(created_at, id)` first so same-timestamp trades fold
/// in a deterministic order.
pub async fn fold_trades(store: &dyn KlineStore, publisher: &dyn EventPublisher, trades: &[Trade]) -> Result<(), CoreError> {
    for trade in trades {
        fold_trade(store, publisher, trade).await?;
    }
    Ok(())
}

/// Rebuilds the bucket for `(symbol, interval)` containing `at` from a
/// caller-supplied, already-sorted trade slice — used for crash recovery
/// and historical backfill/regeneration. Only folds trades whose aligned
/// bucket matches the target bucket; trades
/// outside it are silently ignored rather than erroring, since callers
/// typically pass a superset window.
pub fn regenerate_bucket(symbol: &str, interval: Interval, at: DateTime<Utc>, trades: &[Trade]) -> Option<Kline> {
    let (open_time, close_time) = bucket_for(interval, at);
    let mut kline: Option<Kline> = None;

    for trade in trades {
        if trade.symbol != symbol {
            continue;
        }
        let (trade_open, _) = bucket_for(interval, trade.created_at);
        if trade_open != open_time {
            continue;
        }
        match &mut kline {
            Some(k) => k.fold(trade.price, trade.quantity),
            None => {
                kline = Some(Kline::seed(symbol.to_string(), interval, open_time, close_time, trade.price, trade.quantity));
            }
        }
    }

    kline
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

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

    #[test]
    fn regenerate_bucket_ignores_trades_outside_window() {
        use chrono::TimeZone;
        let in_bucket = Utc.with_ymd_and_hms(2026, 3, 5, 10, 2, 0).unwrap();
        let out_of_bucket = Utc.with_ymd_and_hms(2026, 3, 5, 10, 6, 0).unwrap();

        let trades = vec![
            trade("BTC-USDT", dec!(100), dec!(1), in_bucket),
            trade("BTC-USDT", dec!(200), dec!(1), out_of_bucket),
        ];

        let k = regenerate_bucket("BTC-USDT", Interval::FiveMinutes, in_bucket, &trades).unwrap();
        assert_eq!(k.trade_count, 1);
        assert_eq!(k.high, dec!(100));
    }

    #[test]
    fn regenerate_bucket_folds_in_given_order() {
        use chrono::TimeZone;
        let t0 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 10).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 20).unwrap();

        let trades = vec![
            trade("BTC-USDT", dec!(100), dec!(1), t0),
            trade("BTC-USDT", dec!(110), dec!(2), t1),
        ];

        let k = regenerate_bucket("BTC-USDT", Interval::OneMinute, t0, &trades).unwrap();
        assert_eq!(k.open, dec!(100));
        assert_eq!(k.close, dec!(110));
        assert_eq!(k.high, dec!(110));
        assert_eq!(k.low, dec!(100));
        assert_eq!(k.base_volume, dec!(3));
        assert_eq!(k.trade_count, 2);
    }
}
