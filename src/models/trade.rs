use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{OrderId, Symbol, TradeId, UserId};

/// A single execution between a resting buy order and a resting sell
/// order. Immutable once written — there is no update path, only insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub symbol: Symbol,
    pub buyer_order_id: OrderId,
    pub seller_order_id: OrderId,
    pub buyer_user_id: UserId,
    pub seller_user_id: UserId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub is_buyer_maker: bool,
    pub created_at: DateTime<Utc>,
}

impl Trade {
    pub fn quote_value(&self) -> Decimal {
        crate::decimal::quote_value(self.price, self.quantity)
    }
}
