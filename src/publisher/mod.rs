//! Event Publisher (C5): best-effort fan-out of trades, depth deltas,
//! kline updates and per-user order/balance events to downstream
//! subscribers.
//!
//! A trait rather than a concrete type so the matching and kline
//! collaborators don't need to know whether anything is actually
//! listening. Publish failures must never fail the calling cycle, so
//! every method here returns nothing — a failed send is logged and
//! dropped, never propagated.

mod broadcast_publisher;
mod logging_publisher;

pub use broadcast_publisher::BroadcastPublisher;
pub use logging_publisher::LoggingPublisher;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::core_types::UserId;
use crate::models::kline::Kline;
use crate::models::order::Order;
use crate::models::trade::Trade;

/// One level of a depth snapshot delta.
#[derive(Debug, Clone)]
pub struct DepthLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A depth-of-book change for one symbol, published after each cycle
/// that touches the book.
#[derive(Debug, Clone)]
pub struct DepthDelta {
    pub symbol: String,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_trade(&self, symbol: &str, trade: &Trade);
    async fn publish_depth_delta(&self, delta: &DepthDelta);
    async fn publish_kline_update(&self, kline: &Kline);
    /// `event_type` is an opaque tag (`"ORDER_UPDATE"`, `"BALANCE_UPDATE"`)
    /// mirroring the user-data-stream event names a client-facing gateway
    /// would forward verbatim; this crate does not interpret it.
    async fn publish_user_data_update(&self, user_id: UserId, event_type: &str, order: &Order);
}
