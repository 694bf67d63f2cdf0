//! Spot-trading-venue matching engine and candlestick aggregation core.
//!
//! This crate implements the price-time-priority matching engine (C3)
//! and the kline aggregation pipeline (C4) that consumes its trade
//! stream, together with the durable stores (C1, C2) and the
//! best-effort event publisher (C5) they depend on. Authentication,
//! balance settlement, and the client-facing REST/WebSocket surface are
//! external collaborators, out of scope for this crate.

pub mod config;
pub mod core_types;
pub mod db;
pub mod decimal;
pub mod error;
pub mod kline;
pub mod logging;
pub mod matching;
pub mod models;
pub mod publisher;
pub mod schema;
pub mod store;
pub mod symbol;

pub use error::{CoreError, CoreResult};
