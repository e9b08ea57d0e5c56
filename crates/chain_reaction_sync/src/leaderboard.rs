//! # Leaderboard
//!
//! Cumulative per-address statistics across every observed game.
//!
//! | Event          | Effect on the participant                          |
//! |----------------|----------------------------------------------------|
//! | `PlayerJoined` | `games_played += 1`, `total_spent += fee + burned` |
//! | `ChainEnded`   | `wins += 1`, `total_payout += payout`              |
//!
//! Every source stream (the factory's combined stream, or one stream per
//! game contract) has its own dedup session, so replaying any stream never
//! double-counts.

use std::cmp::Ordering;
use std::collections::HashMap;

use chain_reaction_core::{Address, ContractEvent, GameEvent, ParticipantStats};
use serde::{Deserialize, Serialize};

use crate::dedup::Deduplicator;

/// Presentation order of the leaderboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardSort {
    /// Payout minus spend, highest first.
    #[default]
    NetProfit,
    /// Total payout, highest first.
    TotalPayout,
    /// Wins, most first.
    Wins,
    /// Entries paid, most first.
    GamesPlayed,
}

impl LeaderboardSort {
    fn compare(self, a: &ParticipantStats, b: &ParticipantStats) -> Ordering {
        let primary = match self {
            Self::NetProfit => b.net_profit().cmp(&a.net_profit()),
            Self::TotalPayout => b.total_payout.cmp(&a.total_payout),
            Self::Wins => b.wins.cmp(&a.wins),
            Self::GamesPlayed => b.games_played.cmp(&a.games_played),
        };
        primary.then_with(|| a.address.cmp(&b.address))
    }
}

/// Sorts statistics for display. Ties fall back to address order.
pub fn rank(stats: &mut [ParticipantStats], sort: LeaderboardSort) {
    stats.sort_by(|a, b| sort.compare(a, b));
}

/// Additive statistics aggregator.
#[derive(Debug, Default)]
pub struct Leaderboard {
    stats: HashMap<Address, ParticipantStats>,
    sessions: HashMap<Address, Deduplicator>,
}

impl Leaderboard {
    /// Creates an empty leaderboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event from the stream of contract `source`.
    /// Returns `true` if any statistic changed.
    pub fn apply(&mut self, source: &Address, event: &ContractEvent) -> bool {
        let session = self.sessions.entry(source.clone()).or_default();
        if !session.admit(event.identity) {
            return false;
        }

        match &event.event {
            GameEvent::PlayerJoined {
                player,
                entry_fee,
                amount_burned,
                ..
            } => {
                let stats = self.entry(player);
                stats.games_played += 1;
                stats.total_spent = stats
                    .total_spent
                    .saturating_add(*entry_fee)
                    .saturating_add(*amount_burned);
                true
            }
            GameEvent::ChainEnded { winner, payout, .. } => {
                let stats = self.entry(winner);
                stats.wins += 1;
                stats.total_payout = stats.total_payout.saturating_add(*payout);
                true
            }
            _ => false,
        }
    }

    fn entry(&mut self, address: &Address) -> &mut ParticipantStats {
        self.stats
            .entry(address.clone())
            .or_insert_with(|| ParticipantStats::new(address.clone()))
    }

    /// Statistics for one address.
    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&ParticipantStats> {
        self.stats.get(address)
    }

    /// Every participant, ranked.
    #[must_use]
    pub fn ranked(&self, sort: LeaderboardSort) -> Vec<ParticipantStats> {
        let mut all: Vec<ParticipantStats> = self.stats.values().cloned().collect();
        rank(&mut all, sort);
        all
    }

    /// Number of participants.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether no participant has been seen.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}
