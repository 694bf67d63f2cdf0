//! Process entry point: wires configuration, the PostgreSQL pool, the
//! stores, the publisher, and starts the matching scheduler plus the
//! kline close-out sweep as sibling tasks on one shutdown signal.

use std::sync::Arc;

use spotmatch_core::config::AppConfig;
use spotmatch_core::db::Database;
use spotmatch_core::kline::{self, PgKlineStore};
use spotmatch_core::logging;
use spotmatch_core::matching::{self, ShutdownSignal};
use spotmatch_core::publisher::BroadcastPublisher;
use spotmatch_core::store::{PgMatchJobLedger, PgOrderMatcherStore, PgOrderStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("SPOTMATCH_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Arc::new(AppConfig::load(&config_path)?);

    let _log_guard = logging::init_logging(&config.log);
    tracing::info!(git_hash = env!("GIT_HASH"), "starting spotmatch-core");

    let db = Database::connect(&config.database_url).await?;
    db.health_check().await?;
    spotmatch_core::schema::init_schema(db.pool()).await?;

    let deadline = config.datastore_deadline();
    let order_store: Arc<dyn spotmatch_core::store::OrderStore> = Arc::new(PgOrderStore::new(db.pool().clone(), deadline));
    let job_ledger: Arc<dyn spotmatch_core::store::MatchJobLedger> = Arc::new(PgMatchJobLedger::new(db.pool().clone(), deadline));
    let matcher_store: Arc<dyn spotmatch_core::store::OrderMatcherStore> =
        Arc::new(PgOrderMatcherStore::new(db.pool().clone(), deadline));
    let kline_store: Arc<dyn kline::KlineStore> = Arc::new(PgKlineStore::new(db.pool().clone(), deadline));
    let publisher: Arc<dyn spotmatch_core::publisher::EventPublisher> = Arc::new(BroadcastPublisher::new());

    let shutdown = Arc::new(ShutdownSignal::new());

    let mut scheduler_handle = tokio::spawn({
        let order_store = order_store.clone();
        let job_ledger = job_ledger.clone();
        let matcher_store = matcher_store.clone();
        let kline_store = kline_store.clone();
        let publisher = publisher.clone();
        let config = config.clone();
        let shutdown = shutdown.clone();
        async move {
            matching::run_scheduler(order_store, job_ledger, matcher_store, kline_store, publisher, config, shutdown).await;
        }
    });

    let sweep_handle = tokio::spawn({
        let kline_store = kline_store.clone();
        let publisher = publisher.clone();
        let shutdown = shutdown.clone();
        async move {
            kline::run_sweep_loop(kline_store.as_ref(), publisher.as_ref(), shutdown.as_ref()).await;
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            shutdown.request_shutdown();
            if let Err(err) = scheduler_handle.await {
                tracing::error!(error = %err, "matching scheduler task panicked");
            }
        }
        res = &mut scheduler_handle => {
            if let Err(err) = res {
                tracing::error!(error = %err, "matching scheduler task panicked");
            }
        }
    }

    let _ = sweep_handle.await;

    Ok(())
}
