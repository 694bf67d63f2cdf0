use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::Symbol;
use crate::models::side::Interval;

/// An OHLCV candlestick bucket, uniquely identified by
/// `(symbol, interval, open_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub symbol: Symbol,
    pub interval: Interval,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub base_volume: Decimal,
    pub quote_volume: Decimal,
    pub trade_count: u64,
}

impl Kline {
    /// Seeds a brand-new bucket from the first trade folded into it.
    pub fn seed(symbol: Symbol, interval: Interval, open_time: DateTime<Utc>, close_time: DateTime<Utc>, price: Decimal, qty: Decimal) -> Self {
        Self {
            symbol,
            interval,
            open_time,
            close_time,
            open: price,
            high: price,
            low: price,
            close: price,
            base_volume: qty,
            quote_volume: crate::decimal::quote_value(price, qty),
            trade_count: 1,
        }
    }

    /// Folds one more trade into an existing bucket.
    pub fn fold(&mut self, price: Decimal, qty: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.base_volume += qty;
        self.quote_volume += crate::decimal::quote_value(price, qty);
        self.trade_count += 1;
    }
}
