//! # Player Ledger
//!
//! Participants of the current epoch, rebuilt from a game's event log.
//!
//! Entries are keyed by `(epoch, position)` so a redelivered join
//! overwrites itself. A `ChainStarted` clears the map and the dedup
//! session, then re-admits itself, so only joins after the start remain.
//! Once an epoch is known, joins carrying any other epoch are ignored.

use std::collections::BTreeMap;

use chain_reaction_core::{ContractEvent, GameEvent, ParticipantEntry, U256};

use crate::dedup::Deduplicator;

/// Current-epoch participant ledger with its own dedup session.
#[derive(Debug, Default)]
pub struct PlayerLedger {
    entries: BTreeMap<(U256, u64), ParticipantEntry>,
    dedup: Deduplicator,
    epoch: Option<U256>,
}

impl PlayerLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event. Returns `true` if the ledger changed.
    pub fn apply(&mut self, event: &ContractEvent) -> bool {
        if !self.dedup.admit(event.identity) {
            return false;
        }

        match &event.event {
            GameEvent::ChainStarted { chain_id, .. } => {
                self.entries.clear();
                self.dedup.reset();
                self.dedup.admit(event.identity);
                self.epoch = Some(*chain_id);
                true
            }
            GameEvent::PlayerJoined {
                chain_id,
                player,
                position,
                ..
            } => {
                if self.epoch.is_some_and(|epoch| epoch != *chain_id) {
                    return false;
                }
                let entry = ParticipantEntry {
                    epoch: *chain_id,
                    position: *position,
                    address: player.clone(),
                };
                self.entries.insert((*chain_id, *position), entry);
                true
            }
            _ => false,
        }
    }

    /// Entries in ascending position order.
    #[must_use]
    pub fn ascending(&self) -> Vec<ParticipantEntry> {
        self.entries.values().cloned().collect()
    }

    /// Entries in descending position order (latest first).
    #[must_use]
    pub fn descending(&self) -> Vec<ParticipantEntry> {
        self.entries.values().rev().cloned().collect()
    }

    /// Number of participants recorded.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Epoch of the last observed `ChainStarted`.
    #[inline]
    #[must_use]
    pub const fn epoch(&self) -> Option<U256> {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_reaction_core::{Address, EventIdentity, B256};

    fn event(tx: u8, index: i32, event: GameEvent) -> ContractEvent {
        ContractEvent {
            identity: EventIdentity::new(B256::with_last_byte(tx), index),
            event,
        }
    }

    fn joined(tx: u8, chain: u64, player: &str, position: u64) -> ContractEvent {
        event(
            tx,
            0,
            GameEvent::PlayerJoined {
                chain_id: U256::from(chain),
                player: Address::new(player),
                position,
                entry_fee: U256::from(100u64),
                amount_burned: U256::ZERO,
            },
        )
    }

    fn started(tx: u8, chain: u64) -> ContractEvent {
        event(
            tx,
            0,
            GameEvent::ChainStarted {
                chain_id: U256::from(chain),
                starter: Address::new("1Starter"),
            },
        )
    }

    #[test]
    fn test_joins_ordered() {
        let mut ledger = PlayerLedger::new();
        assert!(ledger.apply(&joined(2, 1, "1B", 2)));
        assert!(ledger.apply(&joined(1, 1, "1A", 1)));

        let positions: Vec<u64> = ledger.ascending().iter().map(|e| e.position).collect();
        assert_eq!(positions, [1, 2]);
        let positions: Vec<u64> = ledger.descending().iter().map(|e| e.position).collect();
        assert_eq!(positions, [2, 1]);
    }

    #[test]
    fn test_duplicate_ignored() {
        let mut ledger = PlayerLedger::new();
        assert!(ledger.apply(&joined(1, 1, "1A", 1)));
        assert!(!ledger.apply(&joined(1, 1, "1A", 1)));
        assert_eq!(ledger.count(), 1);
    }

    #[test]
    fn test_chain_start_clears() {
        let mut ledger = PlayerLedger::new();
        ledger.apply(&joined(1, 1, "1A", 1));
        ledger.apply(&joined(2, 1, "1B", 2));

        assert!(ledger.apply(&started(3, 2)));
        assert_eq!(ledger.count(), 0);
        assert_eq!(ledger.epoch(), Some(U256::from(2u64)));
        // Start event stays admitted in the new session.
        assert!(!ledger.apply(&started(3, 2)));

        ledger.apply(&joined(4, 2, "1C", 1));
        let entries = ledger.ascending();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address, Address::new("1C"));
    }

    #[test]
    fn test_previous_epoch_join_after_start_ignored() {
        let mut ledger = PlayerLedger::new();
        assert!(ledger.apply(&joined(1, 4, "1OldPlayer", 1)));
        assert!(ledger.apply(&started(2, 5)));

        // Redelivered after the session reset.
        assert!(!ledger.apply(&joined(1, 4, "1OldPlayer", 1)));
        assert_eq!(ledger.count(), 0);

        assert!(ledger.apply(&joined(3, 5, "1NewPlayer", 1)));
        let entries = ledger.ascending();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].epoch, U256::from(5u64));
    }

    #[test]
    fn test_other_events_ignored() {
        let mut ledger = PlayerLedger::new();
        let timeout = event(9, 0, GameEvent::ChainTimeout { chain_id: U256::ZERO });
        assert!(!ledger.apply(&timeout));
        assert_eq!(ledger.count(), 0);
    }
}
