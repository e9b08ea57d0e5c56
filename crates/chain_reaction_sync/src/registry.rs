//! # Game Registry
//!
//! Every game the factory has created, discovered from `NewGameCreated`
//! events. An entry is listed as soon as it is discovered; its state and
//! payment asset are filled in by best-effort reconciliation and stay
//! `None`/native until one succeeds.

use std::collections::HashMap;

use chain_reaction_core::{Address, AssetInfo, ContractEvent, ContractId, GameEvent, GameState};

use crate::dedup::Deduplicator;

/// One game known to the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Contract id from the factory event.
    pub contract_id: ContractId,
    /// Address derived from the contract id.
    pub address: Address,
    /// Sequential game id.
    pub game_id: u64,
    /// Last reconciled state, if any reconciliation succeeded.
    pub state: Option<GameState>,
    /// Payment asset metadata.
    pub asset: AssetInfo,
}

/// Registry of factory-created games.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<ContractId, RegistryEntry>,
    dedup: Deduplicator,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one factory event. Returns the new entry when a game was
    /// discovered.
    pub fn discover(&mut self, event: &ContractEvent) -> Option<RegistryEntry> {
        if !self.dedup.admit(event.identity) {
            return None;
        }
        let GameEvent::NewGameCreated {
            contract_id,
            game_id,
        } = &event.event
        else {
            return None;
        };
        if self.entries.contains_key(contract_id) {
            return None;
        }

        let entry = RegistryEntry {
            contract_id: *contract_id,
            address: contract_id.to_address(),
            game_id: *game_id,
            state: None,
            asset: AssetInfo::native(),
        };
        self.entries.insert(*contract_id, entry.clone());
        Some(entry)
    }

    /// Stores a reconciled state and its resolved asset.
    /// Returns `false` for an unknown contract.
    pub fn update(&mut self, contract_id: &ContractId, state: GameState, asset: AssetInfo) -> bool {
        match self.entries.get_mut(contract_id) {
            Some(entry) => {
                entry.state = Some(state);
                entry.asset = asset;
                true
            }
            None => false,
        }
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, contract_id: &ContractId) -> Option<&RegistryEntry> {
        self.entries.get(contract_id)
    }

    /// `(contract id, address)` of every known game.
    #[must_use]
    pub fn targets(&self) -> Vec<(ContractId, Address)> {
        self.entries
            .values()
            .map(|e| (e.contract_id, e.address.clone()))
            .collect()
    }

    /// Entries, newest game first.
    #[must_use]
    pub fn sorted(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| b.game_id.cmp(&a.game_id));
        entries
    }

    /// Number of known games.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no game is known.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
