//! PostgreSQL schema bootstrap.
//!
//! A single idempotent `CREATE TABLE IF NOT EXISTS` pass run at
//! startup, not a migration framework. Column shapes follow the `sqlx::query()` calls
//! in `store::orders`, `store::match_jobs`, `store::order_matchers`, and
//! `kline::store` exactly — this file is the single source of truth for
//! what those queries assume.

use sqlx::PgPool;

/// Each block is executed via `raw_sql` (the simple query protocol)
/// rather than the usual prepared-statement `sqlx::query()` path, since
/// every block here is several semicolon-separated DDL statements and
/// the extended protocol only accepts one statement per call.
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("initializing PostgreSQL schema");

    sqlx::raw_sql(CREATE_ORDERS_TABLE).execute(pool).await?;
    sqlx::raw_sql(CREATE_TRADES_TABLE).execute(pool).await?;
    sqlx::raw_sql(CREATE_MATCH_JOBS_TABLE).execute(pool).await?;
    sqlx::raw_sql(CREATE_ORDER_MATCHERS_TABLE).execute(pool).await?;
    sqlx::raw_sql(CREATE_KLINES_TABLE).execute(pool).await?;

    tracing::info!("PostgreSQL schema ready");
    Ok(())
}

const CREATE_ORDERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id              UUID PRIMARY KEY,
    user_id         BIGINT NOT NULL,
    symbol          TEXT NOT NULL,
    side            TEXT NOT NULL CHECK (side IN ('BUY', 'SELL')),
    order_type      TEXT NOT NULL CHECK (order_type IN ('LIMIT', 'MARKET')),
    price           NUMERIC(38, 18) NOT NULL CHECK (price > 0),
    original_qty    NUMERIC(38, 18) NOT NULL CHECK (original_qty > 0),
    executed_qty    NUMERIC(38, 18) NOT NULL DEFAULT 0 CHECK (executed_qty >= 0),
    status          TEXT NOT NULL CHECK (status IN ('NEW', 'PARTIALLY_FILLED', 'FILLED', 'CANCELED', 'REJECTED', 'EXPIRED')),
    is_working      BOOLEAN NOT NULL,
    is_locked       BOOLEAN NOT NULL DEFAULT false,
    locked_at       TIMESTAMPTZ,
    locking_job_id  UUID,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL,
    CHECK (executed_qty <= original_qty)
);
CREATE INDEX IF NOT EXISTS idx_orders_symbol ON orders (symbol);
CREATE INDEX IF NOT EXISTS idx_orders_active_book ON orders (symbol, side, status, is_working, is_locked);
CREATE INDEX IF NOT EXISTS idx_orders_locked_at ON orders (locked_at) WHERE is_locked = true;
CREATE INDEX IF NOT EXISTS idx_orders_user_created ON orders (user_id, created_at DESC);
"#;

const CREATE_TRADES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    id               UUID PRIMARY KEY,
    symbol           TEXT NOT NULL,
    buyer_order_id   UUID NOT NULL REFERENCES orders (id),
    seller_order_id  UUID NOT NULL REFERENCES orders (id),
    buyer_user_id    BIGINT NOT NULL,
    seller_user_id   BIGINT NOT NULL,
    price            NUMERIC(38, 18) NOT NULL CHECK (price > 0),
    quantity         NUMERIC(38, 18) NOT NULL CHECK (quantity > 0),
    is_buyer_maker   BOOLEAN NOT NULL,
    created_at       TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trades_symbol_created ON trades (symbol, created_at);
"#;

const CREATE_MATCH_JOBS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS match_jobs (
    id                   UUID PRIMARY KEY,
    symbol               TEXT NOT NULL,
    started_at           TIMESTAMPTZ NOT NULL,
    completed_at         TIMESTAMPTZ,
    status               TEXT NOT NULL CHECK (status IN ('RUNNING', 'COMPLETED', 'FAILED')),
    orders_processed     INTEGER NOT NULL DEFAULT 0,
    trades_generated     INTEGER NOT NULL DEFAULT 0,
    processing_time_ms   BIGINT,
    total_volume         NUMERIC(38, 18) NOT NULL DEFAULT 0,
    trade_ids            UUID[] NOT NULL DEFAULT '{}',
    error_message        TEXT
);
CREATE INDEX IF NOT EXISTS idx_match_jobs_symbol_started ON match_jobs (symbol, started_at DESC);
CREATE INDEX IF NOT EXISTS idx_match_jobs_started ON match_jobs (started_at DESC);
"#;

const CREATE_ORDER_MATCHERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS order_matchers (
    symbol                     TEXT PRIMARY KEY,
    is_active                  BOOLEAN NOT NULL DEFAULT true,
    batch_size                 INTEGER NOT NULL DEFAULT 1000,
    last_match_time            TIMESTAMPTZ,
    total_orders_processed     BIGINT NOT NULL DEFAULT 0,
    total_trades_generated     BIGINT NOT NULL DEFAULT 0,
    last_match_time_ms         BIGINT,
    average_match_time_ms      DOUBLE PRECISION NOT NULL DEFAULT 0
);
"#;

const CREATE_KLINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS klines (
    symbol         TEXT NOT NULL,
    interval       TEXT NOT NULL,
    open_time      TIMESTAMPTZ NOT NULL,
    close_time     TIMESTAMPTZ NOT NULL,
    open           NUMERIC(38, 18) NOT NULL,
    high           NUMERIC(38, 18) NOT NULL,
    low            NUMERIC(38, 18) NOT NULL,
    close          NUMERIC(38, 18) NOT NULL,
    base_volume    NUMERIC(38, 18) NOT NULL,
    quote_volume   NUMERIC(38, 18) NOT NULL,
    trade_count    BIGINT NOT NULL CHECK (trade_count >= 1),
    PRIMARY KEY (symbol, interval, open_time)
);
CREATE INDEX IF NOT EXISTS idx_klines_symbol_interval_open ON klines (symbol, interval, open_time DESC);
"#;
