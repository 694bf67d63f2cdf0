//! Domain error model for the matching core.
//!
//! One `thiserror` enum per the error kinds spec'd for the system: bad
//! input, lock contention, datastore hiccups, broken invariants, and
//! best-effort publish failures. Each variant carries the propagation
//! policy in its doc comment rather than in scattered comments at call
//! sites.

use thiserror::Error;

/// Errors surfaced by the matching core to its callers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input at the inbound API (unknown symbol, bad quantity/price).
    /// Surfaced to the caller; never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Cancel attempted on a locked order after bounded retries, or on an
    /// order that is already terminal. Surfaced to the caller; the client
    /// may retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Datastore timeout or network blip. Inside a matching cycle this
    /// fails the cycle and releases locks; the scheduler continues with
    /// the next symbol. Inside a request handler it is returned as-is.
    #[error("transient datastore error: {0}")]
    TransientStore(#[from] sqlx::Error),

    /// An internal check failed (executed > original, negative quantity,
    /// trade outside the cross condition). Logged at CRITICAL by the
    /// caller, fails the cycle, never crashes the process. Trades already
    /// written are not rolled back.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Downstream event delivery failed. Logged at WARN, never fails the
    /// cycle, never retried beyond once.
    #[error("publish failed: {0}")]
    Publish(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
