//! Kline persistence. Grounded on the `Candle`/`sqlx::FromRow` shape
//! found in the indexer reference example, adapted to the
//! symbol/interval/open_time composite key this crate uses instead of a
//! single `market_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core_types::Symbol;
use crate::db::with_deadline;
use crate::error::CoreError;
use crate::models::kline::Kline;
use crate::models::side::Interval;

#[async_trait]
pub trait KlineStore: Send + Sync {
    async fn load(&self, symbol: &str, interval: Interval, open_time: DateTime<Utc>) -> Result<Option<Kline>, CoreError>;
    async fn upsert(&self, kline: &Kline) -> Result<(), CoreError>;
    async fn recent(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Kline>, CoreError>;
    /// All symbols with an `order_matchers` row active. Used by the
    /// close-out sweep to know which (symbol, interval) pairs to check.
    async fn active_symbols(&self) -> Result<Vec<Symbol>, CoreError>;
}

pub struct PgKlineStore {
    pool: PgPool,
    deadline: Duration,
}

impl PgKlineStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    fn row_to_kline(row: &sqlx::postgres::PgRow) -> Result<Kline, CoreError> {
        let interval_str: String = row.try_get("interval").map_err(CoreError::TransientStore)?;
        let interval = Interval::from_str(&interval_str)
            .ok_or_else(|| CoreError::InvariantViolation(format!("unknown interval {interval_str}")))?;
        Ok(Kline {
            symbol: row.try_get("symbol").map_err(CoreError::TransientStore)?,
            interval,
            open_time: row.try_get("open_time").map_err(CoreError::TransientStore)?,
            close_time: row.try_get("close_time").map_err(CoreError::TransientStore)?,
            open: row.try_get::<Decimal, _>("open").map_err(CoreError::TransientStore)?,
            high: row.try_get::<Decimal, _>("high").map_err(CoreError::TransientStore)?,
            low: row.try_get::<Decimal, _>("low").map_err(CoreError::TransientStore)?,
            close: row.try_get::<Decimal, _>("close").map_err(CoreError::TransientStore)?,
            base_volume: row.try_get::<Decimal, _>("base_volume").map_err(CoreError::TransientStore)?,
            quote_volume: row.try_get::<Decimal, _>("quote_volume").map_err(CoreError::TransientStore)?,
            trade_count: row.try_get::<i64, _>("trade_count").map_err(CoreError::TransientStore)? as u64,
        })
    }
}

#[async_trait]
impl KlineStore for PgKlineStore {
    async fn load(&self, symbol: &str, interval: Interval, open_time: DateTime<Utc>) -> Result<Option<Kline>, CoreError> {
        let row = with_deadline(
            self.deadline,
            sqlx::query("SELECT * FROM klines WHERE symbol = $1 AND interval = $2 AND open_time = $3")
                .bind(symbol)
                .bind(interval.as_str())
                .bind(open_time)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_kline).transpose()
    }

    async fn upsert(&self, kline: &Kline) -> Result<(), CoreError> {
        with_deadline(
            self.deadline,
            sqlx::query(
                r#"INSERT INTO klines (
                     symbol, interval, open_time, close_time, open, high, low, close,
                     base_volume, quote_volume, trade_count
                   ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
                   ON CONFLICT (symbol, interval, open_time) DO UPDATE SET
                     close_time = EXCLUDED.close_time,
                     high = EXCLUDED.high,
                     low = EXCLUDED.low,
                     close = EXCLUDED.close,
                     base_volume = EXCLUDED.base_volume,
                     quote_volume = EXCLUDED.quote_volume,
                     trade_count = EXCLUDED.trade_count"#,
            )
            .bind(&kline.symbol)
            .bind(kline.interval.as_str())
            .bind(kline.open_time)
            .bind(kline.close_time)
            .bind(kline.open)
            .bind(kline.high)
            .bind(kline.low)
            .bind(kline.close)
            .bind(kline.base_volume)
            .bind(kline.quote_volume)
            .bind(kline.trade_count as i64)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn recent(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Kline>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query("SELECT * FROM klines WHERE symbol = $1 AND interval = $2 ORDER BY open_time DESC LIMIT $3")
                .bind(symbol)
                .bind(interval.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(Self::row_to_kline).collect()
    }

    async fn active_symbols(&self) -> Result<Vec<Symbol>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query("SELECT symbol FROM order_matchers WHERE is_active = true").fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(|r| r.try_get("symbol").map_err(CoreError::TransientStore)).collect()
    }
}
