//! Per-symbol matcher configuration and moving statistics, persisted in
//! the `order_matchers` table.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::db::with_deadline;
use crate::error::CoreError;
use crate::models::match_job::OrderMatcher;

#[async_trait]
pub trait OrderMatcherStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<OrderMatcher>, CoreError>;
    async fn upsert(&self, matcher: &OrderMatcher) -> Result<(), CoreError>;
}

pub struct PgOrderMatcherStore {
    pool: PgPool,
    deadline: Duration,
}

impl PgOrderMatcherStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }
}

#[async_trait]
impl OrderMatcherStore for PgOrderMatcherStore {
    async fn list_active(&self) -> Result<Vec<OrderMatcher>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query("SELECT * FROM order_matchers WHERE is_active = true").fetch_all(&self.pool),
        )
        .await?;
        rows.iter()
            .map(|row| {
                Ok(OrderMatcher {
                    symbol: row.try_get("symbol")?,
                    is_active: row.try_get("is_active")?,
                    batch_size: row.try_get::<i32, _>("batch_size")? as u32,
                    last_match_time: row.try_get("last_match_time")?,
                    total_orders_processed: row.try_get::<i64, _>("total_orders_processed")? as u64,
                    total_trades_generated: row.try_get::<i64, _>("total_trades_generated")? as u64,
                    last_match_time_ms: row.try_get("last_match_time_ms")?,
                    average_match_time_ms: row.try_get("average_match_time_ms")?,
                })
            })
            .collect()
    }

    async fn upsert(&self, matcher: &OrderMatcher) -> Result<(), CoreError> {
        with_deadline(
            self.deadline,
            sqlx::query(
                r#"INSERT INTO order_matchers (
                     symbol, is_active, batch_size, last_match_time, total_orders_processed,
                     total_trades_generated, last_match_time_ms, average_match_time_ms
                   ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                   ON CONFLICT (symbol) DO UPDATE SET
                     is_active = EXCLUDED.is_active,
                     batch_size = EXCLUDED.batch_size,
                     last_match_time = EXCLUDED.last_match_time,
                     total_orders_processed = EXCLUDED.total_orders_processed,
                     total_trades_generated = EXCLUDED.total_trades_generated,
                     last_match_time_ms = EXCLUDED.last_match_time_ms,
                     average_match_time_ms = EXCLUDED.average_match_time_ms"#,
            )
            .bind(&matcher.symbol)
            .bind(matcher.is_active)
            .bind(matcher.batch_size as i32)
            .bind(matcher.last_match_time)
            .bind(matcher.total_orders_processed as i64)
            .bind(matcher.total_trades_generated as i64)
            .bind(matcher.last_match_time_ms)
            .bind(matcher.average_match_time_ms)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
