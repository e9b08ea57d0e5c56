//! # Chain Reaction Sync
//!
//! Keeps a client's view of Chain Reaction game contracts current by
//! polling the node's event log and reconciling contract state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   events    ┌─────────────────┐   refresh   ┌─────────────────┐
//! │  Node           │ ──────────▶ │  Subscription   │ ──────────▶ │  Reconciler     │
//! │  (EventLog)     │             │  (dedup, actor) │ ◀────────── │  (StateQuery)   │
//! └─────────────────┘             └────────┬────────┘  GameState  └─────────────────┘
//!                                          │ watch
//!                                          ▼
//!                                 GameView / RegistryView / LeaderboardView
//! ```
//!
//! ## CRITICAL RULES
//!
//! - Every subscription owns its tasks. A stalled contract never blocks
//!   another.
//! - A failed poll cycle changes nothing but the visible `error` field.
//! - Nothing is published after a subscription is cancelled.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod dedup;
pub mod leaderboard;
pub mod ledger;
pub mod node;
pub mod reconciler;
pub mod registry;
pub mod remote;
pub mod simulator;
pub mod subscription;
pub mod tokens;

pub use config::{AbiConfig, Network, PollingConfig, SyncConfig};
pub use dedup::Deduplicator;
pub use leaderboard::{Leaderboard, LeaderboardSort};
pub use ledger::PlayerLedger;
pub use node::NodeClient;
pub use reconciler::Reconciler;
pub use registry::{Registry, RegistryEntry};
pub use remote::{AssetResolver, EventLog, EventPage, StateQuery};
pub use simulator::{SimEvent, SimulatedNode};
pub use subscription::{
    GameSubscription, GameView, LeaderboardSource, LeaderboardSubscription, LeaderboardView,
    RegistrySubscription, RegistryView,
};
pub use tokens::TokenListResolver;
