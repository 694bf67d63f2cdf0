use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::core_types::UserId;
use crate::models::kline::Kline;
use crate::models::order::Order;
use crate::models::trade::Trade;
use crate::publisher::{DepthDelta, EventPublisher};

/// One channel per topic. Subscribers reconnect and backfill rather than
/// block the publisher: a `tokio::sync::broadcast::Sender::send` never
/// awaits a receiver and
/// only fails when there are zero subscribers, which this publisher
/// treats as a normal, silent no-op rather than an error.
///
/// A slow subscriber that falls behind the channel's ring buffer gets
/// `RecvError::Lagged` on its next `recv` — by design this publisher
/// does not try to prevent that; a subscriber that needs a gap-free
/// history re-reads it from the Order/Trade/Kline stores after
/// reconnecting.
pub struct BroadcastPublisher {
    trades: broadcast::Sender<Trade>,
    depth: broadcast::Sender<DepthDelta>,
    klines: broadcast::Sender<Kline>,
    user_data: broadcast::Sender<UserDataEvent>,
}

/// Published on `publish_user_data_update`; `order` is cloned once per
/// send since `broadcast::Sender` requires `Clone + Send + 'static`.
#[derive(Debug, Clone)]
pub struct UserDataEvent {
    pub user_id: UserId,
    pub event_type: String,
    pub order: Order,
}

const CHANNEL_CAPACITY: usize = 1024;

impl BroadcastPublisher {
    pub fn new() -> Self {
        Self {
            trades: broadcast::channel(CHANNEL_CAPACITY).0,
            depth: broadcast::channel(CHANNEL_CAPACITY).0,
            klines: broadcast::channel(CHANNEL_CAPACITY).0,
            user_data: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe_trades(&self) -> broadcast::Receiver<Trade> {
        self.trades.subscribe()
    }

    pub fn subscribe_depth(&self) -> broadcast::Receiver<DepthDelta> {
        self.depth.subscribe()
    }

    pub fn subscribe_klines(&self) -> broadcast::Receiver<Kline> {
        self.klines.subscribe()
    }

    pub fn subscribe_user_data(&self) -> broadcast::Receiver<UserDataEvent> {
        self.user_data.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish_trade(&self, symbol: &str, trade: &Trade) {
        if self.trades.send(trade.clone()).is_err() {
            tracing::trace!(symbol, trade_id = %trade.id, "no trade subscribers");
        }
    }

    async fn publish_depth_delta(&self, delta: &DepthDelta) {
        if self.depth.send(delta.clone()).is_err() {
            tracing::trace!(symbol = %delta.symbol, "no depth subscribers");
        }
    }

    async fn publish_kline_update(&self, kline: &Kline) {
        if self.klines.send(kline.clone()).is_err() {
            tracing::trace!(symbol = %kline.symbol, interval = %kline.interval, "no kline subscribers");
        }
    }

    async fn publish_user_data_update(&self, user_id: UserId, event_type: &str, order: &Order) {
        let event = UserDataEvent {
            user_id,
            event_type: event_type.to_string(),
            order: order.clone(),
        };
        if self.user_data.send(event).is_err() {
            tracing::trace!(user_id, event_type, "no user-data subscribers");
        }
    }
}
