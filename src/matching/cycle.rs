//! One matching cycle: recovery sweep, job open, book read, lock,
//! match, persist, publish, fold, unlock.

use chrono::Utc;

use crate::core_types::OrderId;
use crate::decimal::sum_quote_value;
use crate::error::CoreError;
use crate::kline::KlineStore;
use crate::matching::algorithm::run_match;
use crate::models::match_job::{MatchJob, OrderMatcher};
use crate::publisher::EventPublisher;
use crate::store::{MatchJobLedger, OrderStore};

/// Outcome of one cycle, returned for the scheduler's statistics/logging.
pub struct CycleReport {
    pub job: MatchJob,
}

/// Runs the full cycle protocol for one matcher. Never panics; all
/// failure paths produce a FAILED `MatchJob` and still release any locks
/// acquired via the always-unlock finalizer at the end.
pub async fn run_cycle(
    order_store: &dyn OrderStore,
    job_ledger: &dyn MatchJobLedger,
    kline_store: &dyn KlineStore,
    publisher: &dyn EventPublisher,
    matcher: &OrderMatcher,
    lock_timeout: chrono::Duration,
) -> Result<CycleReport, CoreError> {
    // Step 1: recovery sweep. Best-effort — failure here is logged and the
    // cycle proceeds; a crashed prior cycle's locks will simply be
    // reclaimed on a later tick.
    if let Err(err) = order_store.unlock_timed_out_orders(lock_timeout).await {
        tracing::warn!(symbol = %matcher.symbol, error = %err, "recovery sweep failed, continuing");
    }

    let started_at = Utc::now();
    let mut job = MatchJob::open(matcher.symbol.clone(), started_at);
    job_ledger.create(&job).await?;

    // Step 3: read books.
    let buys = match order_store.get_active_buy_orders(&matcher.symbol, matcher.batch_size).await {
        Ok(b) => b,
        Err(err) => return fail_and_return(job_ledger, &mut job, 0, err).await,
    };
    let sells = match order_store.get_active_sell_orders(&matcher.symbol, matcher.batch_size).await {
        Ok(s) => s,
        Err(err) => return fail_and_return(job_ledger, &mut job, 0, err).await,
    };

    // Step 4: empty book short-circuit.
    if buys.is_empty() || sells.is_empty() {
        job.complete(Utc::now(), 0, Vec::new(), rust_decimal::Decimal::ZERO);
        job_ledger.update(&job).await?;
        return Ok(CycleReport { job });
    }

    let all_ids: Vec<OrderId> = buys.iter().chain(sells.iter()).map(|o| o.id).collect();

    // Step 5: attempt to lock. Rows already locked by a concurrent cycle
    // are silently dropped by the store; we must not match them.
    let locked_ids = match order_store.lock_orders(&all_ids, job.id).await {
        Ok(ids) => ids,
        Err(err) => return fail_and_return(job_ledger, &mut job, 0, err).await,
    };
    let locked_set: std::collections::HashSet<OrderId> = locked_ids.into_iter().collect();

    // RAII-style finalizer: whatever happens below, the orders we
    // actually locked are unlocked on the way out.
    let guard = UnlockGuard::new(order_store, locked_set.iter().copied().collect());

    let buys: Vec<_> = buys.into_iter().filter(|o| locked_set.contains(&o.id)).collect();
    let sells: Vec<_> = sells.into_iter().filter(|o| locked_set.contains(&o.id)).collect();
    let orders_processed = (buys.len() + sells.len()) as u32;

    if buys.is_empty() || sells.is_empty() {
        job.complete(Utc::now(), orders_processed, Vec::new(), rust_decimal::Decimal::ZERO);
        job_ledger.update(&job).await?;
        guard.release().await;
        return Ok(CycleReport { job });
    }

    // Step 6: run the pure algorithm.
    let outcome = match run_match(buys, sells, Utc::now()) {
        Ok(o) => o,
        Err(err) => {
            tracing::error!(symbol = %matcher.symbol, job_id = %job.id, error = %err, "invariant violation during match");
            job.fail(Utc::now(), orders_processed, err.to_string());
            job_ledger.update(&job).await?;
            guard.release().await;
            return Err(err);
        }
    };

    // Step 7: persist. Trades are written first — a visible trade with
    // stale order state is recoverable via the next recovery sweep, the
    // inverse is not — then order updates.
    if !outcome.trades.is_empty() {
        if let Err(err) = order_store.create_trades(&outcome.trades).await {
            job.fail(Utc::now(), orders_processed, err.to_string());
            let _ = job_ledger.update(&job).await;
            guard.release().await;
            return Err(err);
        }
        if let Err(err) = order_store.update_orders(&outcome.touched).await {
            job.fail(Utc::now(), orders_processed, err.to_string());
            let _ = job_ledger.update(&job).await;
            guard.release().await;
            return Err(err);
        }

        for trade in &outcome.trades {
            publisher.publish_trade(&matcher.symbol, trade).await;
        }
        for order in &outcome.touched {
            publisher
                .publish_user_data_update(order.user_id, "ORDER_UPDATE", order)
                .await;
        }

        // Trades are already committed; a kline fold failure here is
        // recoverable via `kline::regenerate_bucket` and must not turn a
        // successful cycle into a FAILED one.
        if let Err(err) = crate::kline::fold_trades(kline_store, publisher, &outcome.trades).await {
            tracing::warn!(symbol = %matcher.symbol, error = %err, "kline fold failed for this cycle's trades");
        }
    }

    // Step 8: close the job.
    let trade_ids = outcome.trades.iter().map(|t| t.id).collect();
    let total_volume = sum_quote_value(outcome.trades.iter().map(|t| (t.price, t.quantity)));
    job.complete(Utc::now(), orders_processed, trade_ids, total_volume);
    job_ledger.update(&job).await?;

    // Step 9: always unlock.
    guard.release().await;

    Ok(CycleReport { job })
}

async fn fail_and_return(
    job_ledger: &dyn MatchJobLedger,
    job: &mut MatchJob,
    orders_processed: u32,
    err: CoreError,
) -> Result<CycleReport, CoreError> {
    job.fail(Utc::now(), orders_processed, err.to_string());
    let _ = job_ledger.update(job).await;
    Err(err)
}

/// Guarantees `unlock_orders` runs exactly once for the ids it holds,
/// regardless of which return path out of `run_cycle` is taken.
struct UnlockGuard<'a> {
    store: &'a dyn OrderStore,
    ids: Vec<OrderId>,
    released: bool,
}

impl<'a> UnlockGuard<'a> {
    fn new(store: &'a dyn OrderStore, ids: Vec<OrderId>) -> Self {
        Self { store, ids, released: false }
    }

    async fn release(mut self) {
        self.released = true;
        if self.ids.is_empty() {
            return;
        }
        if let Err(err) = self.store.unlock_orders(&self.ids).await {
            tracing::error!(error = %err, "failed to unlock orders after cycle");
        }
    }
}

impl<'a> Drop for UnlockGuard<'a> {
    fn drop(&mut self) {
        if !self.released && !self.ids.is_empty() {
            tracing::error!(
                "UnlockGuard dropped without release() — {} orders may remain locked until timeout reclamation",
                self.ids.len()
            );
        }
    }
}

