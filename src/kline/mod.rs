//! Candlestick aggregation: the consumer side of the trade stream the
//! matching engine produces. Folding happens in application code
//! against an explicit load/upsert store rather than inside the
//! database engine, so each bucket update is deterministic and
//! replayable (see DESIGN.md).

pub mod aggregator;
pub mod align;
pub mod store;
pub mod sweep;

pub use aggregator::{fold_trade, fold_trades, regenerate_bucket};
pub use store::{KlineStore, PgKlineStore};
pub use sweep::{run_sweep_loop, sweep_all, sweep_interval};
