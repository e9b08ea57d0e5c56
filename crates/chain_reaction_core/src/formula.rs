//! # Price & Timer Formulas
//!
//! **CRITICAL: INTEGER ARITHMETIC ONLY**
//!
//! These reproduce the contract's read-side arithmetic so a client can
//! predict the next price or countdown without a round trip. Every step
//! truncates exactly like the on-chain integer division.
//!
//! ## Bonding Price
//!
//! ```text
//! p(1) = base
//! p(n) = p(n-1) + p(n-1) * bps / 10000      n = 2..position
//! ```
//!
//! This is NOT `base * (1 + bps/10000)^(n-1)`. Truncating at every step
//! gives different (lower) prices than the closed form, and the contract
//! truncates at every step.

use alloy_primitives::U256;

use crate::error::{SyncError, SyncResult};
use crate::ids::Bps;

/// Basis point denominator.
const BPS_DENOMINATOR: u64 = 10_000;

/// One step of the bonding curve.
#[inline]
fn step(price: U256, multiplier: Bps) -> Option<U256> {
    let increment = price.checked_mul(U256::from(multiplier.get()))? / U256::from(BPS_DENOMINATOR);
    price.checked_add(increment)
}

/// Price paid by the participant at `position` (1-based).
///
/// # Errors
///
/// Returns `InvalidArgument` if `position` is zero or the price overflows
/// 256 bits.
pub fn price_at_position(base: U256, multiplier: Bps, position: u64) -> SyncResult<U256> {
    if position < 1 {
        return Err(SyncError::InvalidArgument(
            "position must be at least 1".to_string(),
        ));
    }

    let mut price = base;
    for n in 2..=position {
        price = step(price, multiplier).ok_or_else(|| {
            SyncError::InvalidArgument(format!("price overflows at position {n}"))
        })?;
    }
    Ok(price)
}

/// Prices for positions `1..=count`, computed in a single pass.
///
/// # Errors
///
/// Returns `InvalidArgument` if a price overflows 256 bits.
pub fn price_series(base: U256, multiplier: Bps, count: usize) -> SyncResult<Vec<U256>> {
    let mut prices = Vec::with_capacity(count);
    let mut price = base;
    for n in 0..count {
        if n > 0 {
            price = step(price, multiplier).ok_or_else(|| {
                SyncError::InvalidArgument(format!("price overflows at position {}", n + 1))
            })?;
        }
        prices.push(price);
    }
    Ok(prices)
}

/// What the contract's `getNextEntryPrice` view returns.
///
/// An inactive game restarts at `base`. Overflow saturates; a contract in
/// that state cannot accept another entry anyway.
#[must_use]
pub fn next_entry_price(current: U256, multiplier: Bps, base: U256, is_active: bool) -> U256 {
    if !is_active {
        return base;
    }
    step(current, multiplier).unwrap_or(U256::MAX)
}

/// Countdown the contract will reset to once the next participant joins.
///
/// `duration - participants * decrease`, never below `min_duration`.
#[must_use]
pub const fn next_reset_duration(
    duration_ms: u64,
    decrease_ms: u64,
    min_duration_ms: u64,
    participants_after_join: u64,
) -> u64 {
    let reduced = duration_ms.saturating_sub(participants_after_join.saturating_mul(decrease_ms));
    if reduced < min_duration_ms {
        min_duration_ms
    } else {
        reduced
    }
}
