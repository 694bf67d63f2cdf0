//! Domain data model: orders, trades, match jobs, and klines. Flat
//! records with opaque ids — no cyclic ownership, no arena allocation
//! needed.

pub mod kline;
pub mod match_job;
pub mod order;
pub mod side;
pub mod trade;

pub use kline::Kline;
pub use match_job::{MatchJob, OrderMatcher};
pub use order::Order;
pub use side::{Interval, MatchJobStatus, OrderStatus, OrderType, Side};
pub use trade::Trade;
