//! # Participants
//!
//! Per-epoch ledger entries and cumulative per-address statistics.

use alloy_primitives::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::ids::Address;

/// One participant in one epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// Epoch the entry belongs to.
    pub epoch: U256,
    /// 1-based position within the epoch.
    pub position: u64,
    /// Participant address.
    pub address: Address,
}

/// Cumulative statistics for one address across every observed epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantStats {
    /// Participant address.
    pub address: Address,
    /// Epochs won.
    pub wins: u64,
    /// Sum of all payouts received.
    pub total_payout: U256,
    /// Entries paid.
    pub games_played: u64,
    /// Sum of entry fees plus burned amounts.
    pub total_spent: U256,
}

impl ParticipantStats {
    /// Empty statistics for `address`.
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self {
            address,
            wins: 0,
            total_payout: U256::ZERO,
            games_played: 0,
            total_spent: U256::ZERO,
        }
    }

    /// Payout minus spend. Saturates at the `I256` range.
    #[must_use]
    pub fn net_profit(&self) -> I256 {
        let payout = I256::try_from(self.total_payout).unwrap_or(I256::MAX);
        let spent = I256::try_from(self.total_spent).unwrap_or(I256::MAX);
        payout.saturating_sub(spent)
    }

    /// Wins per game played, in basis points.
    #[must_use]
    pub fn win_rate_bps(&self) -> u64 {
        if self.games_played == 0 {
            return 0;
        }
        self.wins.saturating_mul(10_000) / self.games_played
    }
}
