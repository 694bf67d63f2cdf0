//! Persistence layer: one concrete store per entity rather than a single
//! generic repository abstraction — the operation surface per entity is
//! small and each store has distinct invariants worth keeping separate.

pub mod match_jobs;
pub mod order_matchers;
pub mod orders;

pub use match_jobs::{MatchJobLedger, PgMatchJobLedger};
pub use order_matchers::{OrderMatcherStore, PgOrderMatcherStore};
pub use orders::{CancelOutcome, OrderHistoryFilter, OrderStore, Page, PgOrderStore};
