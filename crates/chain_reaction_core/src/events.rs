//! # Contract Events
//!
//! Event identities and typed decoding of raw log entries.
//!
//! Field layouts (positional, extra trailing fields tolerated):
//!
//! | Event            | Fields                                              |
//! |------------------|-----------------------------------------------------|
//! | `ChainStarted`   | chainId, starter                                    |
//! | `PlayerJoined`   | chainId, player, position, entryFee, amountBurned   |
//! | `ChainEnded`     | chainId, winner, payout                             |
//! | `ChainTimeout`   | chainId                                             |
//! | `PotBoosted`     | chainId, booster, amount                            |
//! | `NewGameCreated` | contractId, gameId                                  |

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::ids::{Address, ContractId, TxId};
use crate::value::FieldValue;

/// Event emitted when a new epoch starts.
pub const CHAIN_STARTED: &str = "ChainStarted";
/// Event emitted for every entry.
pub const PLAYER_JOINED: &str = "PlayerJoined";
/// Event emitted when an epoch is settled.
pub const CHAIN_ENDED: &str = "ChainEnded";
/// Event emitted when an epoch times out without settlement.
pub const CHAIN_TIMEOUT: &str = "ChainTimeout";
/// Event emitted when the pot receives an incentive.
pub const POT_BOOSTED: &str = "PotBoosted";
/// Factory event emitted for every new game contract.
pub const NEW_GAME_CREATED: &str = "NewGameCreated";

/// Events after which a watched game's state is refreshed.
pub const REFRESH_TRIGGERS: [&str; 5] = [
    CHAIN_STARTED,
    PLAYER_JOINED,
    CHAIN_ENDED,
    CHAIN_TIMEOUT,
    POT_BOOSTED,
];

/// Whether an event named `name` changes contract state.
#[must_use]
pub fn is_refresh_trigger(name: &str) -> bool {
    REFRESH_TRIGGERS.contains(&name)
}

/// Deduplication key: transaction plus in-transaction event index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventIdentity {
    /// Transaction that emitted the event.
    pub tx_id: TxId,
    /// Index of the event within the transaction.
    pub event_index: i32,
}

impl EventIdentity {
    /// Creates an identity.
    #[inline]
    #[must_use]
    pub const fn new(tx_id: TxId, event_index: i32) -> Self {
        Self { tx_id, event_index }
    }
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{}", self.tx_id, self.event_index)
    }
}

/// An event as delivered by the remote log, fields still schema-less.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Transaction that emitted the event.
    pub tx_id: TxId,
    /// Index of the event within the transaction.
    pub event_index: i32,
    /// Event name.
    pub name: String,
    /// Positional fields.
    pub fields: Vec<FieldValue>,
}

impl RawEvent {
    /// The event's deduplication key.
    #[inline]
    #[must_use]
    pub const fn identity(&self) -> EventIdentity {
        EventIdentity::new(self.tx_id, self.event_index)
    }
}

/// Typed game and factory events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A new epoch started.
    ChainStarted {
        /// New epoch id.
        chain_id: U256,
        /// Participant who paid the first entry.
        starter: Address,
    },
    /// A participant joined the current epoch.
    PlayerJoined {
        /// Epoch id.
        chain_id: U256,
        /// Joining participant.
        player: Address,
        /// 1-based position in the epoch.
        position: u64,
        /// Entry fee paid.
        entry_fee: U256,
        /// Portion of the entry burned.
        amount_burned: U256,
    },
    /// An epoch was settled.
    ChainEnded {
        /// Epoch id.
        chain_id: U256,
        /// Winning participant.
        winner: Address,
        /// Payout received.
        payout: U256,
    },
    /// An epoch timed out.
    ChainTimeout {
        /// Epoch id.
        chain_id: U256,
    },
    /// The pot was boosted.
    PotBoosted {
        /// Epoch id.
        chain_id: U256,
        /// Who paid the boost.
        booster: Address,
        /// Boost amount.
        amount: U256,
    },
    /// The factory created a new game contract.
    NewGameCreated {
        /// New contract id.
        contract_id: ContractId,
        /// Sequential game id.
        game_id: u64,
    },
    /// Any event this client does not interpret.
    Other {
        /// Event name.
        name: String,
    },
}

impl GameEvent {
    /// Whether this event changes contract state in a way that warrants a
    /// state refresh.
    #[inline]
    #[must_use]
    pub const fn triggers_refresh(&self) -> bool {
        matches!(
            self,
            Self::ChainStarted { .. }
                | Self::PlayerJoined { .. }
                | Self::ChainEnded { .. }
                | Self::ChainTimeout { .. }
                | Self::PotBoosted { .. }
        )
    }

    /// Decodes the typed event from a raw one.
    ///
    /// # Errors
    ///
    /// Returns `SchemaMismatch` when a known event has too few fields or a
    /// field cannot be coerced. Unknown names decode to `Other`.
    pub fn decode(raw: &RawEvent) -> SyncResult<Self> {
        let f = EventFields::new(raw);
        let event = match raw.name.as_str() {
            CHAIN_STARTED => Self::ChainStarted {
                chain_id: f.u256(0)?,
                starter: f.address(1)?,
            },
            PLAYER_JOINED => Self::PlayerJoined {
                chain_id: f.u256(0)?,
                player: f.address(1)?,
                position: f.u64(2)?,
                entry_fee: f.u256(3)?,
                amount_burned: f.u256(4)?,
            },
            CHAIN_ENDED => Self::ChainEnded {
                chain_id: f.u256(0)?,
                winner: f.address(1)?,
                payout: f.u256(2)?,
            },
            CHAIN_TIMEOUT => Self::ChainTimeout {
                chain_id: f.u256(0)?,
            },
            POT_BOOSTED => Self::PotBoosted {
                chain_id: f.u256(0)?,
                booster: f.address(1)?,
                amount: f.u256(2)?,
            },
            NEW_GAME_CREATED => Self::NewGameCreated {
                contract_id: ContractId(f.bytes32(0)?),
                game_id: f.u64(1)?,
            },
            other => Self::Other {
                name: other.to_string(),
            },
        };
        Ok(event)
    }
}

/// A typed event together with its identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    /// Deduplication key.
    pub identity: EventIdentity,
    /// Typed payload.
    pub event: GameEvent,
}

impl ContractEvent {
    /// Decodes a raw event.
    ///
    /// # Errors
    ///
    /// See [`GameEvent::decode`].
    pub fn decode(raw: &RawEvent) -> SyncResult<Self> {
        Ok(Self {
            identity: raw.identity(),
            event: GameEvent::decode(raw)?,
        })
    }
}

struct EventFields<'a> {
    name: &'a str,
    fields: &'a [FieldValue],
}

impl<'a> EventFields<'a> {
    fn new(raw: &'a RawEvent) -> Self {
        Self {
            name: &raw.name,
            fields: &raw.fields,
        }
    }

    fn get(&self, index: usize) -> SyncResult<&'a FieldValue> {
        self.fields.get(index).ok_or_else(|| {
            SyncError::schema(
                "event fields",
                format!("{} has {} fields, needs index {index}", self.name, self.fields.len()),
            )
        })
    }

    fn bad(&self, index: usize, wanted: &str) -> SyncError {
        SyncError::schema(
            "event fields",
            format!("{} field {index}: expected {wanted}", self.name),
        )
    }

    fn u256(&self, index: usize) -> SyncResult<U256> {
        self.get(index)?
            .coerce_u256()
            .ok_or_else(|| self.bad(index, "integer"))
    }

    fn u64(&self, index: usize) -> SyncResult<u64> {
        self.get(index)?
            .coerce_u64()
            .ok_or_else(|| self.bad(index, "u64 integer"))
    }

    fn address(&self, index: usize) -> SyncResult<Address> {
        self.get(index)?
            .coerce_address()
            .ok_or_else(|| self.bad(index, "address"))
    }

    fn bytes32(&self, index: usize) -> SyncResult<alloy_primitives::B256> {
        self.get(index)?
            .coerce_bytes32()
            .ok_or_else(|| self.bad(index, "32-byte id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn raw(name: &str, fields: Vec<FieldValue>) -> RawEvent {
        RawEvent {
            tx_id: B256::with_last_byte(1),
            event_index: 0,
            name: name.to_string(),
            fields,
        }
    }

    #[test]
    fn test_player_joined_decode() {
        let event = GameEvent::decode(&raw(
            PLAYER_JOINED,
            vec![
                FieldValue::u256(U256::from(2u64)),
                FieldValue::Address("1Alice:0".into()),
                FieldValue::u256(U256::from(3u64)),
                FieldValue::u256(U256::from(110u64)),
                FieldValue::u256(U256::from(1u64)),
            ],
        ))
        .unwrap();

        assert_eq!(
            event,
            GameEvent::PlayerJoined {
                chain_id: U256::from(2u64),
                player: Address::new("1Alice"),
                position: 3,
                entry_fee: U256::from(110u64),
                amount_burned: U256::from(1u64),
            }
        );
        assert!(event.triggers_refresh());
    }

    #[test]
    fn test_new_game_created_decode() {
        let id = B256::repeat_byte(0x42);
        let event = GameEvent::decode(&raw(
            NEW_GAME_CREATED,
            vec![FieldValue::bytes32(id), FieldValue::u256(U256::from(7u64))],
        ))
        .unwrap();
        assert_eq!(
            event,
            GameEvent::NewGameCreated {
                contract_id: ContractId(id),
                game_id: 7
            }
        );
        assert!(!event.triggers_refresh());
    }

    #[test]
    fn test_short_event_rejected() {
        let err = GameEvent::decode(&raw(CHAIN_ENDED, vec![FieldValue::u256(U256::ZERO)])).unwrap_err();
        assert!(err.to_string().contains("ChainEnded has 1 fields"));
    }

    #[test]
    fn test_unknown_event() {
        let event = GameEvent::decode(&raw("ContractDestroyed", vec![])).unwrap();
        assert_eq!(event, GameEvent::Other { name: "ContractDestroyed".into() });
        assert!(!event.triggers_refresh());
    }

    #[test]
    fn test_trigger_names() {
        assert!(is_refresh_trigger("PotBoosted"));
        assert!(!is_refresh_trigger(NEW_GAME_CREATED));
        assert!(!is_refresh_trigger("playerjoined"));
    }

    #[test]
    fn test_identity_display() {
        let identity = EventIdentity::new(B256::with_last_byte(0xff), 2);
        assert!(identity.to_string().ends_with("ff:2"));
    }
}
