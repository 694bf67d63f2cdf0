//! Long-lived scheduler loop: one tick per `default_match_interval_ms`,
//! one `run_cycle` per active symbol, errors isolated per symbol so one
//! broken matcher never stalls the others.
//!
//! `ShutdownSignal` is a plain `AtomicBool` checked between ticks,
//! paired with a `tokio::select!` against `tokio::signal::ctrl_c()` so
//! a pending sleep is interrupted the moment shutdown is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::AppConfig;
use crate::kline::KlineStore;
use crate::matching::cycle::run_cycle;
use crate::publisher::EventPublisher;
use crate::store::{MatchJobLedger, OrderMatcherStore, OrderStore};

pub struct ShutdownSignal {
    shutdown: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self { shutdown: AtomicBool::new(false) }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs until `shutdown` is signaled. Each tick: reload the active
/// matcher set, run one cycle per symbol sequentially — symbols don't
/// need cross-symbol concurrency, and sequential execution keeps the
/// datastore connection pool pressure predictable — fold cycle
/// statistics back into the matcher row, then sleep.
pub async fn run_scheduler(
    order_store: Arc<dyn OrderStore>,
    job_ledger: Arc<dyn MatchJobLedger>,
    matcher_store: Arc<dyn OrderMatcherStore>,
    kline_store: Arc<dyn KlineStore>,
    publisher: Arc<dyn EventPublisher>,
    config: Arc<AppConfig>,
    shutdown: Arc<ShutdownSignal>,
) {
    let lock_timeout = chrono::Duration::seconds(config.matching.order_lock_timeout_seconds);
    let tick = config.match_interval();

    while !shutdown.is_shutdown_requested() {
        let matchers = match matcher_store.list_active().await {
            Ok(m) => m,
            Err(err) => {
                tracing::error!(error = %err, "failed to load active matchers, retrying next tick");
                sleep_or_exit(tick, &shutdown).await;
                continue;
            }
        };

        for mut matcher in matchers {
            if shutdown.is_shutdown_requested() {
                break;
            }
            let cycle_started = Utc::now();
            match run_cycle(
                order_store.as_ref(),
                job_ledger.as_ref(),
                kline_store.as_ref(),
                publisher.as_ref(),
                &matcher,
                lock_timeout,
            )
            .await
            {
                Ok(report) => {
                    let elapsed_ms = (Utc::now() - cycle_started).num_milliseconds();
                    matcher.record_cycle(
                        Utc::now(),
                        report.job.orders_processed,
                        report.job.trades_generated,
                        elapsed_ms,
                    );
                    if let Err(err) = matcher_store.upsert(&matcher).await {
                        tracing::warn!(symbol = %matcher.symbol, error = %err, "failed to persist matcher statistics");
                    }
                }
                Err(err) => {
                    tracing::error!(symbol = %matcher.symbol, error = %err, "matching cycle failed");
                }
            }
        }

        sleep_or_exit(tick, &shutdown).await;
    }

    tracing::info!("scheduler loop exiting on shutdown signal");
}

async fn sleep_or_exit(tick: Duration, shutdown: &ShutdownSignal) {
    tokio::select! {
        _ = tokio::time::sleep(tick) => {}
        _ = wait_for_ctrl_c() => {
            shutdown.request_shutdown();
        }
    }
}

async fn wait_for_ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No controlling terminal (e.g. under a supervisor without a
        // signal handler installed); block forever so the select! falls
        // through to the sleep branch instead of busy-looping.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_signal_round_trips() {
        let s = ShutdownSignal::new();
        assert!(!s.is_shutdown_requested());
        s.request_shutdown();
        assert!(s.is_shutdown_requested());
    }
}
