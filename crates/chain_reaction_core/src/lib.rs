//! # Chain Reaction Core
//!
//! Domain model for synchronizing with Chain Reaction game contracts.
//!
//! ## CRITICAL RULES
//!
//! This crate must NEVER:
//! - perform I/O or depend on an async runtime
//! - use floating point for amounts (everything is `U256`)
//! - patch a `GameState` in place (snapshots are replaced wholesale)
//!
//! Network access, polling and aggregation live in `chain_reaction_sync`.
//!
//! ## Decode Paths
//!
//! ```text
//!  node state ──► schema::decode_canonical ──► GameState { source: Canonical }
//!       │               (typed, + views)
//!       └──────► legacy::decode_legacy ──────► GameState { source: Legacy }
//!                 (positional, derived locally)
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod asset;
pub mod clock;
pub mod error;
pub mod events;
pub mod formula;
pub mod ids;
pub mod legacy;
pub mod participant;
pub mod readiness;
pub mod schema;
pub mod state;
pub mod value;

pub use asset::AssetInfo;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SyncError, SyncResult};
pub use events::{ContractEvent, EventIdentity, GameEvent, RawEvent};
pub use ids::{Address, AssetId, Bps, ContractId, TxId};
pub use participant::{ParticipantEntry, ParticipantStats};
pub use readiness::{derive_ui_state, UiState};
pub use state::{ContractFields, GameState, StateSource};
pub use value::{FieldValue, RawState};

/// Re-exported so downstream crates name amounts with the same type.
pub use alloy_primitives::{B256, I256, U256};
