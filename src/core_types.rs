//! Core types used throughout the system
//!
//! Fundamental type aliases shared by every module. Centralizing them here
//! means a future switch in representation (e.g. snowflake ids instead of
//! UUIDs) touches one file.

use uuid::Uuid;

/// Order identity. Assigned by the order-entry collaborator at creation time.
pub type OrderId = Uuid;

/// Trade identity. Assigned by the Order Store on insert.
pub type TradeId = Uuid;

/// Match cycle identity. One per matching cycle invocation.
pub type JobId = Uuid;

/// Owning user identity, opaque to the matching core.
pub type UserId = i64;

/// Trading pair identifier, e.g. "BTC-USDT".
pub type Symbol = String;
