use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{JobId, Symbol, TradeId};
use crate::models::side::MatchJobStatus;

/// One invocation of the matching protocol for one symbol. Transitions
/// RUNNING -> {COMPLETED, FAILED} exactly once; never mutated again after
/// that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchJob {
    pub id: JobId,
    pub symbol: Symbol,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: MatchJobStatus,
    pub orders_processed: u32,
    pub trades_generated: u32,
    pub processing_time_ms: Option<i64>,
    pub total_volume: Decimal,
    pub trade_ids: Vec<TradeId>,
    pub error_message: Option<String>,
}

impl MatchJob {
    pub fn open(symbol: Symbol, started_at: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new_v4(),
            symbol,
            started_at,
            completed_at: None,
            status: MatchJobStatus::Running,
            orders_processed: 0,
            trades_generated: 0,
            processing_time_ms: None,
            total_volume: Decimal::ZERO,
            trade_ids: Vec::new(),
            error_message: None,
        }
    }

    /// Closes the job as COMPLETED with the given statistics.
    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        orders_processed: u32,
        trade_ids: Vec<TradeId>,
        total_volume: Decimal,
    ) {
        self.completed_at = Some(now);
        self.status = MatchJobStatus::Completed;
        self.orders_processed = orders_processed;
        self.trades_generated = trade_ids.len() as u32;
        self.processing_time_ms = Some((now - self.started_at).num_milliseconds());
        self.total_volume = total_volume;
        self.trade_ids = trade_ids;
    }

    /// Closes the job as FAILED, recording the error. Orders processed may
    /// still be non-zero if the failure occurred after the read step.
    pub fn fail(&mut self, now: DateTime<Utc>, orders_processed: u32, error_message: String) {
        self.completed_at = Some(now);
        self.status = MatchJobStatus::Failed;
        self.orders_processed = orders_processed;
        self.processing_time_ms = Some((now - self.started_at).num_milliseconds());
        self.error_message = Some(error_message);
    }
}

/// Per-symbol matcher configuration and moving statistics, persisted on
/// the `order_matchers` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderMatcher {
    pub symbol: Symbol,
    pub is_active: bool,
    pub batch_size: u32,
    pub last_match_time: Option<DateTime<Utc>>,
    pub total_orders_processed: u64,
    pub total_trades_generated: u64,
    pub last_match_time_ms: Option<i64>,
    pub average_match_time_ms: f64,
}

impl OrderMatcher {
    pub fn new(symbol: Symbol, batch_size: u32) -> Self {
        Self {
            symbol,
            is_active: true,
            batch_size,
            last_match_time: None,
            total_orders_processed: 0,
            total_trades_generated: 0,
            last_match_time_ms: None,
            average_match_time_ms: 0.0,
        }
    }

    /// Folds one completed cycle's statistics into the moving average,
    /// a simple incremental-mean update with no fixed window.
    pub fn record_cycle(&mut self, now: DateTime<Utc>, orders_processed: u32, trades_generated: u32, elapsed_ms: i64) {
        self.last_match_time = Some(now);
        self.total_orders_processed += orders_processed as u64;
        self.total_trades_generated += trades_generated as u64;
        self.last_match_time_ms = Some(elapsed_ms);

        let n = self.total_trades_generated.max(1) as f64;
        self.average_match_time_ms += (elapsed_ms as f64 - self.average_match_time_ms) / n;
    }
}
