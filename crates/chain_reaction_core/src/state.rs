//! # Canonical Game State
//!
//! The one record every consumer sees, whichever schema version the
//! contract runs. A `GameState` is an immutable snapshot: a refresh
//! replaces it wholesale, callers never patch individual fields.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::formula;
use crate::ids::{Address, AssetId, Bps};

/// Which decode path produced a `GameState`.
///
/// The derived values differ in origin: the canonical path reads them from
/// contract views, the legacy path computes them locally against the client
/// clock. Small disagreements between the two are a known tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateSource {
    /// Current contract version, typed decode plus view calls.
    Canonical,
    /// Older contract version, positional decode plus local derivation.
    Legacy,
}

/// Stored contract fields, without any derived view values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFields {
    /// Epoch identifier; increments each time a new chain starts.
    pub chain_id: U256,
    /// Highest entry paid so far in this epoch.
    pub current_entry: U256,
    /// Participant currently leading.
    pub last_player: Address,
    /// When the last entry landed (ms).
    pub last_entry_timestamp: u64,
    /// Accumulated pot.
    pub pot: U256,
    /// Incentive amount added on top of the pot.
    pub boost_amount: U256,
    /// Whether an epoch is running.
    pub is_active: bool,
    /// Participants in this epoch.
    pub player_count: u64,
    /// Scheduled end of the epoch (ms).
    pub end_timestamp: u64,
    /// Price of the first entry.
    pub base_entry: U256,
    /// Per-entry price increase.
    pub multiplier: Bps,
    /// Configured countdown (ms).
    pub duration_ms: u64,
    /// Countdown decrease per participant (ms).
    pub duration_decrease_ms: u64,
    /// Countdown floor (ms).
    pub min_duration_ms: u64,
    /// Payment asset.
    pub asset_id: AssetId,
    /// Share of each entry that is burned.
    pub burn_rate: Bps,
    /// Cumulative burned amount.
    pub burned_amount: U256,
}

/// Canonical, reconciled game state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Stored contract fields.
    pub fields: ContractFields,
    /// Price the next participant pays.
    pub next_entry_price: U256,
    /// Whether the epoch can be settled now.
    pub can_end: bool,
    /// Decode path that produced this snapshot.
    pub source: StateSource,
}

impl GameState {
    /// Assembles a snapshot from fields and view results.
    #[must_use]
    pub const fn new(
        fields: ContractFields,
        next_entry_price: U256,
        can_end: bool,
        source: StateSource,
    ) -> Self {
        Self {
            fields,
            next_entry_price,
            can_end,
            source,
        }
    }

    /// Derives the view values locally, the way the legacy path does.
    #[must_use]
    pub fn derive_locally(fields: ContractFields, now_ms: u64, source: StateSource) -> Self {
        let next_entry_price = formula::next_entry_price(
            fields.current_entry,
            fields.multiplier,
            fields.base_entry,
            fields.is_active,
        );
        let can_end = fields.is_active && now_ms >= fields.end_timestamp;
        Self::new(fields, next_entry_price, can_end, source)
    }

    /// Epoch identifier.
    #[inline]
    #[must_use]
    pub const fn chain_id(&self) -> U256 {
        self.fields.chain_id
    }

    /// Whether an epoch is running.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.fields.is_active
    }

    /// Milliseconds until the scheduled end, zero once it has passed.
    #[inline]
    #[must_use]
    pub const fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.fields.end_timestamp.saturating_sub(now_ms)
    }

    /// Whether the epoch is claimable at `now_ms`.
    #[inline]
    #[must_use]
    pub const fn is_claimable(&self, now_ms: u64) -> bool {
        self.can_end || now_ms >= self.fields.end_timestamp
    }

    /// Countdown the next entry will reset to.
    #[must_use]
    pub const fn predicted_reset_duration(&self) -> u64 {
        formula::next_reset_duration(
            self.fields.duration_ms,
            self.fields.duration_decrease_ms,
            self.fields.min_duration_ms,
            self.fields.player_count.saturating_add(1),
        )
    }

    /// Price paid at `position` in the current epoch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for position zero or on overflow.
    pub fn price_at(&self, position: u64) -> SyncResult<U256> {
        formula::price_at_position(self.fields.base_entry, self.fields.multiplier, position)
    }
}
