//! Order Store (C1): durable repository of orders, with the
//! compare-and-set lock primitive the matching cycle depends on.
//!
//! One trait plus one concrete `sqlx`/Postgres implementation, chosen
//! because the operations below need relational predicates (conditional
//! UPDATE, multi-column ORDER BY, array membership) that a time-series
//! wide-table store doesn't give you for free.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core_types::{JobId, OrderId, Symbol, UserId};
use crate::db::with_deadline;
use crate::error::CoreError;
use crate::models::order::Order;
use crate::models::side::{OrderStatus, OrderType, Side};
use crate::models::trade::Trade;

/// Filter for order-history queries by the order-entry collaborator.
#[derive(Debug, Clone, Default)]
pub struct OrderHistoryFilter {
    pub symbol: Option<Symbol>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Order persistence and lifecycle operations. One trait per entity
/// rather than a shared generic repository — the surface area is small
/// and each store has store-specific invariants.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_active_buy_orders(&self, symbol: &str, limit: u32) -> Result<Vec<Order>, CoreError>;
    async fn get_active_sell_orders(&self, symbol: &str, limit: u32) -> Result<Vec<Order>, CoreError>;

    /// Atomically transitions `is_locked: false -> true` for each given
    /// order id, only where it is still unlocked. Returns the orders that
    /// were actually locked — the caller must tolerate this set shrinking
    /// relative to the input.
    async fn lock_orders(&self, order_ids: &[OrderId], job_id: JobId) -> Result<Vec<OrderId>, CoreError>;

    /// Clears lock state unconditionally for the given ids.
    async fn unlock_orders(&self, order_ids: &[OrderId]) -> Result<(), CoreError>;

    /// Clears lock state for every order locked longer than `timeout`.
    /// Returns the number of rows affected.
    async fn unlock_timed_out_orders(&self, timeout: chrono::Duration) -> Result<u64, CoreError>;

    /// Bulk replace by id.
    async fn update_orders(&self, orders: &[Order]) -> Result<(), CoreError>;

    async fn insert_order(&self, order: &Order) -> Result<(), CoreError>;

    /// Bulk insert, all-or-nothing at the database level (a single
    /// transaction). Called after `update_orders` in the cycle protocol's
    /// happy path so that an observer who sees a trade can also observe
    /// the corresponding order's new executed quantity.
    async fn create_trades(&self, trades: &[Trade]) -> Result<(), CoreError>;

    async fn get_order(&self, order_id: OrderId, user_id: UserId) -> Result<Option<Order>, CoreError>;
    async fn get_open_orders(&self, user_id: UserId, symbol: Option<&str>) -> Result<Vec<Order>, CoreError>;
    async fn get_order_history(&self, user_id: UserId, filter: OrderHistoryFilter, page: u32, page_size: u32) -> Result<Page<Order>, CoreError>;

    /// Transitions NEW|PARTIALLY_FILLED -> CANCELED, only if not locked.
    /// Returns `Ok(false)` if the order is already terminal or missing;
    /// the caller (order-entry collaborator) is responsible for retrying
    /// a bounded number of times against transient lock contention.
    async fn cancel_order(&self, order_id: OrderId, user_id: UserId, now: DateTime<Utc>) -> Result<CancelOutcome, CoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Canceled,
    NotFound,
    AlreadyTerminal,
    Locked,
}

pub struct PgOrderStore {
    pool: PgPool,
    deadline: Duration,
}

impl PgOrderStore {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<Order, CoreError> {
        let side: String = row.try_get("side").map_err(CoreError::TransientStore)?;
        let order_type: String = row.try_get("order_type").map_err(CoreError::TransientStore)?;
        let status: String = row.try_get("status").map_err(CoreError::TransientStore)?;
        Ok(Order {
            id: row.try_get("id").map_err(CoreError::TransientStore)?,
            user_id: row.try_get("user_id").map_err(CoreError::TransientStore)?,
            symbol: row.try_get("symbol").map_err(CoreError::TransientStore)?,
            side: parse_side(&side)?,
            order_type: parse_order_type(&order_type)?,
            price: row.try_get::<Decimal, _>("price").map_err(CoreError::TransientStore)?,
            original_qty: row.try_get::<Decimal, _>("original_qty").map_err(CoreError::TransientStore)?,
            executed_qty: row.try_get::<Decimal, _>("executed_qty").map_err(CoreError::TransientStore)?,
            status: parse_status(&status)?,
            is_working: row.try_get("is_working").map_err(CoreError::TransientStore)?,
            is_locked: row.try_get("is_locked").map_err(CoreError::TransientStore)?,
            locked_at: row.try_get("locked_at").map_err(CoreError::TransientStore)?,
            locking_job_id: row.try_get("locking_job_id").map_err(CoreError::TransientStore)?,
            created_at: row.try_get("created_at").map_err(CoreError::TransientStore)?,
            updated_at: row.try_get("updated_at").map_err(CoreError::TransientStore)?,
        })
    }
}

fn parse_side(s: &str) -> Result<Side, CoreError> {
    match s {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(CoreError::InvariantViolation(format!("unknown side {other}"))),
    }
}

fn parse_order_type(s: &str) -> Result<OrderType, CoreError> {
    match s {
        "LIMIT" => Ok(OrderType::Limit),
        "MARKET" => Ok(OrderType::Market),
        other => Err(CoreError::InvariantViolation(format!("unknown order type {other}"))),
    }
}

fn parse_status(s: &str) -> Result<OrderStatus, CoreError> {
    Ok(match s {
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        "EXPIRED" => OrderStatus::Expired,
        other => return Err(CoreError::InvariantViolation(format!("unknown status {other}"))),
    })
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

fn order_type_str(t: OrderType) -> &'static str {
    match t {
        OrderType::Limit => "LIMIT",
        OrderType::Market => "MARKET",
    }
}

fn status_str(s: OrderStatus) -> &'static str {
    match s {
        OrderStatus::New => "NEW",
        OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
        OrderStatus::Filled => "FILLED",
        OrderStatus::Canceled => "CANCELED",
        OrderStatus::Rejected => "REJECTED",
        OrderStatus::Expired => "EXPIRED",
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn get_active_buy_orders(&self, symbol: &str, limit: u32) -> Result<Vec<Order>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query(
                r#"SELECT * FROM orders
                   WHERE symbol = $1 AND side = 'BUY' AND status = 'NEW'
                     AND is_working = true AND is_locked = false
                   ORDER BY price DESC, created_at ASC, id ASC
                   LIMIT $2"#,
            )
            .bind(symbol)
            .bind(limit as i64)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn get_active_sell_orders(&self, symbol: &str, limit: u32) -> Result<Vec<Order>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query(
                r#"SELECT * FROM orders
                   WHERE symbol = $1 AND side = 'SELL' AND status = 'NEW'
                     AND is_working = true AND is_locked = false
                   ORDER BY price ASC, created_at ASC, id ASC
                   LIMIT $2"#,
            )
            .bind(symbol)
            .bind(limit as i64)
            .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn lock_orders(&self, order_ids: &[OrderId], job_id: JobId) -> Result<Vec<OrderId>, CoreError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = with_deadline(
            self.deadline,
            sqlx::query(
                r#"UPDATE orders
                   SET is_locked = true, locked_at = now(), locking_job_id = $1
                   WHERE id = ANY($2) AND is_locked = false
                   RETURNING id"#,
            )
            .bind(job_id)
            .bind(order_ids)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.try_get::<OrderId, _>("id"))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn unlock_orders(&self, order_ids: &[OrderId]) -> Result<(), CoreError> {
        if order_ids.is_empty() {
            return Ok(());
        }
        with_deadline(
            self.deadline,
            sqlx::query(
                r#"UPDATE orders SET is_locked = false, locked_at = NULL, locking_job_id = NULL
                   WHERE id = ANY($1)"#,
            )
            .bind(order_ids)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn unlock_timed_out_orders(&self, timeout: chrono::Duration) -> Result<u64, CoreError> {
        let threshold = Utc::now() - timeout;
        let result = with_deadline(
            self.deadline,
            sqlx::query(
                r#"UPDATE orders SET is_locked = false, locked_at = NULL, locking_job_id = NULL
                   WHERE is_locked = true AND locked_at < $1"#,
            )
            .bind(threshold)
            .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn update_orders(&self, orders: &[Order]) -> Result<(), CoreError> {
        if orders.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(CoreError::TransientStore)?;
        for order in orders {
            sqlx::query(
                r#"UPDATE orders SET
                     executed_qty = $1, status = $2, is_working = $3,
                     is_locked = $4, locked_at = $5, locking_job_id = $6, updated_at = $7
                   WHERE id = $8"#,
            )
            .bind(order.executed_qty)
            .bind(status_str(order.status))
            .bind(order.is_working)
            .bind(order.is_locked)
            .bind(order.locked_at)
            .bind(order.locking_job_id)
            .bind(order.updated_at)
            .bind(order.id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::TransientStore)?;
        }
        tx.commit().await.map_err(CoreError::TransientStore)?;
        Ok(())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), CoreError> {
        with_deadline(
            self.deadline,
            sqlx::query(
                r#"INSERT INTO orders (
                     id, user_id, symbol, side, order_type, price, original_qty, executed_qty,
                     status, is_working, is_locked, locked_at, locking_job_id, created_at, updated_at
                   ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)"#,
            )
            .bind(order.id)
            .bind(order.user_id)
            .bind(&order.symbol)
            .bind(side_str(order.side))
            .bind(order_type_str(order.order_type))
            .bind(order.price)
            .bind(order.original_qty)
            .bind(order.executed_qty)
            .bind(status_str(order.status))
            .bind(order.is_working)
            .bind(order.is_locked)
            .bind(order.locked_at)
            .bind(order.locking_job_id)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn create_trades(&self, trades: &[Trade]) -> Result<(), CoreError> {
        if trades.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(CoreError::TransientStore)?;
        for trade in trades {
            sqlx::query(
                r#"INSERT INTO trades (
                     id, symbol, buyer_order_id, seller_order_id, buyer_user_id, seller_user_id,
                     price, quantity, is_buyer_maker, created_at
                   ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)"#,
            )
            .bind(trade.id)
            .bind(&trade.symbol)
            .bind(trade.buyer_order_id)
            .bind(trade.seller_order_id)
            .bind(trade.buyer_user_id)
            .bind(trade.seller_user_id)
            .bind(trade.price)
            .bind(trade.quantity)
            .bind(trade.is_buyer_maker)
            .bind(trade.created_at)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::TransientStore)?;
        }
        tx.commit().await.map_err(CoreError::TransientStore)?;
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId, user_id: UserId) -> Result<Option<Order>, CoreError> {
        let row = with_deadline(
            self.deadline,
            sqlx::query("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
                .bind(order_id)
                .bind(user_id)
                .fetch_optional(&self.pool),
        )
        .await?;
        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn get_open_orders(&self, user_id: UserId, symbol: Option<&str>) -> Result<Vec<Order>, CoreError> {
        let rows = match symbol {
            Some(symbol) => {
                with_deadline(
                    self.deadline,
                    sqlx::query(
                        r#"SELECT * FROM orders WHERE user_id = $1 AND symbol = $2 AND is_working = true
                           ORDER BY created_at DESC"#,
                    )
                    .bind(user_id)
                    .bind(symbol)
                    .fetch_all(&self.pool),
                )
                .await?
            }
            None => {
                with_deadline(
                    self.deadline,
                    sqlx::query(
                        r#"SELECT * FROM orders WHERE user_id = $1 AND is_working = true
                           ORDER BY created_at DESC"#,
                    )
                    .bind(user_id)
                    .fetch_all(&self.pool),
                )
                .await?
            }
        };
        rows.iter().map(Self::row_to_order).collect()
    }

    async fn get_order_history(
        &self,
        user_id: UserId,
        filter: OrderHistoryFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Order>, CoreError> {
        let offset = (page as i64) * (page_size as i64);
        let status_filter = filter.status.map(status_str);

        let rows = with_deadline(
            self.deadline,
            sqlx::query(
                r#"SELECT * FROM orders
                   WHERE user_id = $1
                     AND ($2::text IS NULL OR symbol = $2)
                     AND ($3::text IS NULL OR status = $3)
                   ORDER BY created_at DESC
                   LIMIT $4 OFFSET $5"#,
            )
            .bind(user_id)
            .bind(filter.symbol.as_deref())
            .bind(status_filter)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(&self.pool),
        )
        .await?;

        let total: i64 = with_deadline(
            self.deadline,
            sqlx::query(
                r#"SELECT COUNT(*) AS count FROM orders
                   WHERE user_id = $1
                     AND ($2::text IS NULL OR symbol = $2)
                     AND ($3::text IS NULL OR status = $3)"#,
            )
            .bind(user_id)
            .bind(filter.symbol.as_deref())
            .bind(status_filter)
            .fetch_one(&self.pool),
        )
        .await?
        .try_get("count")?;

        Ok(Page {
            items: rows.iter().map(Self::row_to_order).collect::<Result<Vec<_>, _>>()?,
            total,
        })
    }

    async fn cancel_order(&self, order_id: OrderId, user_id: UserId, now: DateTime<Utc>) -> Result<CancelOutcome, CoreError> {
        let existing = self.get_order(order_id, user_id).await?;
        let Some(order) = existing else {
            return Ok(CancelOutcome::NotFound);
        };
        if order.status.is_terminal() {
            return Ok(CancelOutcome::AlreadyTerminal);
        }
        if order.is_locked {
            return Ok(CancelOutcome::Locked);
        }

        let result = with_deadline(
            self.deadline,
            sqlx::query(
                r#"UPDATE orders SET status = 'CANCELED', is_working = false, updated_at = $1
                   WHERE id = $2 AND user_id = $3 AND is_locked = false
                     AND status IN ('NEW', 'PARTIALLY_FILLED')"#,
            )
            .bind(now)
            .bind(order_id)
            .bind(user_id)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Ok(CancelOutcome::Locked);
        }
        Ok(CancelOutcome::Canceled)
    }
}
