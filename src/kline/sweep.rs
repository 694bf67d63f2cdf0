//! Periodic close-out sweep: at the end of each bucket, flag the
//! previous bucket as final for every symbol that has one.
//! Symbols with no trades in that window get no row at all — absence
//! of a bucket is a stronger invariant than a zero-volume row, so the
//! sweep never fabricates one.

use chrono::Utc;

use crate::error::CoreError;
use crate::kline::align::bucket_for;
use crate::kline::store::KlineStore;
use crate::models::side::Interval;
use crate::publisher::EventPublisher;

/// Runs one sweep pass for `interval`: computes the previous bucket
/// relative to `now`, and for every active symbol that has a row there,
/// republishes it as a close-out signal. Idempotent — running it twice
/// for the same bucket produces the same publications.
pub async fn sweep_interval(
    store: &dyn KlineStore,
    publisher: &dyn EventPublisher,
    interval: Interval,
    now: chrono::DateTime<Utc>,
) -> Result<u32, CoreError> {
    let previous_bucket_instant = now - interval.duration();
    let (open_time, _) = bucket_for(interval, previous_bucket_instant);

    let symbols = store.active_symbols().await?;
    let mut closed = 0u32;

    for symbol in symbols {
        if let Some(kline) = store.load(&symbol, interval, open_time).await? {
            publisher.publish_kline_update(&kline).await;
            closed += 1;
        }
        // No trades in that window: no row exists, nothing to do.
    }

    Ok(closed)
}

/// Runs a sweep pass for every supported interval.
pub async fn sweep_all(store: &dyn KlineStore, publisher: &dyn EventPublisher, now: chrono::DateTime<Utc>) -> Result<(), CoreError> {
    for interval in Interval::ALL {
        sweep_interval(store, publisher, interval, now).await?;
    }
    Ok(())
}

/// Long-lived loop: wakes once per minute (the finest supported
/// interval) and sweeps every interval whose bucket has just closed.
/// Coarser intervals are swept redundantly on minutes that aren't their
/// boundary — `sweep_interval` is cheap and idempotent, so this trades a
/// little wasted work for a single unified tick instead of one task per
/// interval.
pub async fn run_sweep_loop(store: &dyn KlineStore, publisher: &dyn EventPublisher, shutdown: &crate::matching::ShutdownSignal) {
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
    while !shutdown.is_shutdown_requested() {
        tick.tick().await;
        if let Err(err) = sweep_all(store, publisher, Utc::now()).await {
            tracing::warn!(error = %err, "kline close-out sweep failed");
        }
    }
}
