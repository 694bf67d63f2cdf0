//! Decimal arithmetic helpers.
//!
//! All price, quantity, and derived-volume arithmetic in the matching core
//! goes through `rust_decimal::Decimal`, never binary floating point. This
//! mirrors the convention already used for client-facing amounts in the
//! teacher's `money` module, generalized to the full price/qty/volume
//! domain rather than just display formatting.

use rust_decimal::Decimal;

/// Quote-denominated value of an execution: `price * quantity`.
///
/// No rounding is performed — `Decimal` multiplication is exact up to its
/// internal scale, and precision-clipping belongs to the order-entry
/// collaborator at admission, not to the matching core.
#[inline]
pub fn quote_value(price: Decimal, quantity: Decimal) -> Decimal {
    price * quantity
}

/// Sums quote values of a set of (price, quantity) executions in the
/// decimal domain, used for `MatchJob::total_volume`.
#[inline]
pub fn sum_quote_value<I: IntoIterator<Item = (Decimal, Decimal)>>(executions: I) -> Decimal {
    executions
        .into_iter()
        .fold(Decimal::ZERO, |acc, (price, qty)| acc + quote_value(price, qty))
}
