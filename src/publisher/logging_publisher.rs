use async_trait::async_trait;

use crate::core_types::UserId;
use crate::models::kline::Kline;
use crate::models::order::Order;
use crate::models::trade::Trade;
use crate::publisher::{DepthDelta, EventPublisher};

/// An `EventPublisher` with no subscribers: every event is logged at
/// debug level and dropped. Useful for single-process runs, and as the
/// fallback the scheduler falls back to if a `BroadcastPublisher`
/// channel is ever closed.
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish_trade(&self, symbol: &str, trade: &Trade) {
        tracing::debug!(symbol, trade_id = %trade.id, price = %trade.price, qty = %trade.quantity, "trade");
    }

    async fn publish_depth_delta(&self, delta: &DepthDelta) {
        tracing::debug!(symbol = %delta.symbol, bids = delta.bids.len(), asks = delta.asks.len(), "depth delta");
    }

    async fn publish_kline_update(&self, kline: &Kline) {
        tracing::debug!(symbol = %kline.symbol, interval = %kline.interval, open_time = %kline.open_time, "kline update");
    }

    async fn publish_user_data_update(&self, user_id: UserId, event_type: &str, order: &Order) {
        tracing::debug!(user_id, event_type, order_id = %order.id, "user data update");
    }
}
