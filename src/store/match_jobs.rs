//! Match Job Ledger (C2): append-with-later-update log of matching
//! cycles, used for crash forensics and statistics.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::core_types::TradeId;
use crate::db::with_deadline;
use crate::error::CoreError;
use crate::models::match_job::MatchJob;
use crate::models::side::MatchJobStatus;

#[async_trait]
pub trait MatchJobLedger: Send + Sync {
    async fn create(&self, job: &MatchJob) -> Result<(), CoreError>;
    async fn update(&self, job: &MatchJob) -> Result<(), CoreError>;
    async fn recent_by_symbol(&self, symbol: &str, limit: u32) -> Result<Vec<MatchJob>, CoreError>;
    async fn latest(&self, limit: u32) -> Result<Vec<MatchJob>, CoreError>;
}

pub struct PgMatchJobLedger {
    pool: PgPool,
    deadline: Duration,
}

impl PgMatchJobLedger {
    pub fn new(pool: PgPool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    fn row_to_job(row: &sqlx::postgres::PgRow) -> Result<MatchJob, CoreError> {
        let status: String = row.try_get("status")?;
        let trade_ids: Vec<TradeId> = row.try_get("trade_ids")?;
        Ok(MatchJob {
            id: row.try_get("id")?,
            symbol: row.try_get("symbol")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            status: parse_status(&status)?,
            orders_processed: row.try_get::<i32, _>("orders_processed")? as u32,
            trades_generated: row.try_get::<i32, _>("trades_generated")? as u32,
            processing_time_ms: row.try_get("processing_time_ms")?,
            total_volume: row.try_get::<Decimal, _>("total_volume")?,
            trade_ids,
            error_message: row.try_get("error_message")?,
        })
    }
}

fn parse_status(s: &str) -> Result<MatchJobStatus, CoreError> {
    Ok(match s {
        "RUNNING" => MatchJobStatus::Running,
        "COMPLETED" => MatchJobStatus::Completed,
        "FAILED" => MatchJobStatus::Failed,
        other => return Err(CoreError::InvariantViolation(format!("unknown match job status {other}"))),
    })
}

fn status_str(s: MatchJobStatus) -> &'static str {
    match s {
        MatchJobStatus::Running => "RUNNING",
        MatchJobStatus::Completed => "COMPLETED",
        MatchJobStatus::Failed => "FAILED",
    }
}

#[async_trait]
impl MatchJobLedger for PgMatchJobLedger {
    async fn create(&self, job: &MatchJob) -> Result<(), CoreError> {
        with_deadline(
            self.deadline,
            sqlx::query(
                r#"INSERT INTO match_jobs (
                     id, symbol, started_at, completed_at, status, orders_processed,
                     trades_generated, processing_time_ms, total_volume, trade_ids, error_message
                   ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)"#,
            )
            .bind(job.id)
            .bind(&job.symbol)
            .bind(job.started_at)
            .bind(job.completed_at)
            .bind(status_str(job.status))
            .bind(job.orders_processed as i32)
            .bind(job.trades_generated as i32)
            .bind(job.processing_time_ms)
            .bind(job.total_volume)
            .bind(&job.trade_ids)
            .bind(&job.error_message)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, job: &MatchJob) -> Result<(), CoreError> {
        with_deadline(
            self.deadline,
            sqlx::query(
                r#"UPDATE match_jobs SET
                     completed_at = $1, status = $2, orders_processed = $3, trades_generated = $4,
                     processing_time_ms = $5, total_volume = $6, trade_ids = $7, error_message = $8
                   WHERE id = $9"#,
            )
            .bind(job.completed_at)
            .bind(status_str(job.status))
            .bind(job.orders_processed as i32)
            .bind(job.trades_generated as i32)
            .bind(job.processing_time_ms)
            .bind(job.total_volume)
            .bind(&job.trade_ids)
            .bind(&job.error_message)
            .bind(job.id)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn recent_by_symbol(&self, symbol: &str, limit: u32) -> Result<Vec<MatchJob>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query("SELECT * FROM match_jobs WHERE symbol = $1 ORDER BY started_at DESC LIMIT $2")
                .bind(symbol)
                .bind(limit as i64)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(Self::row_to_job).collect()
    }

    async fn latest(&self, limit: u32) -> Result<Vec<MatchJob>, CoreError> {
        let rows = with_deadline(
            self.deadline,
            sqlx::query("SELECT * FROM match_jobs ORDER BY started_at DESC LIMIT $1")
                .bind(limit as i64)
                .fetch_all(&self.pool),
        )
        .await?;
        rows.iter().map(Self::row_to_job).collect()
    }
}
