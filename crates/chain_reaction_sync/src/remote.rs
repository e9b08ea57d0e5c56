//! # Remote Interfaces
//!
//! The three collaborators the engine consumes. Everything async in this
//! crate is generic over them, so the same subscriptions run against the
//! HTTP [`NodeClient`](crate::node::NodeClient) and the in-memory
//! [`SimulatedNode`](crate::simulator::SimulatedNode).

use std::future::Future;

use chain_reaction_core::{Address, AssetId, AssetInfo, ContractFields, RawEvent, RawState, SyncResult, U256};

/// Contract state and read-only views.
pub trait StateQuery: Send + Sync + 'static {
    /// Fetches and typed-decodes the canonical field set.
    fn contract_fields(
        &self,
        address: &Address,
    ) -> impl Future<Output = SyncResult<ContractFields>> + Send;

    /// Fetches the schema-less immutable and mutable field lists.
    fn raw_state(&self, address: &Address) -> impl Future<Output = SyncResult<RawState>> + Send;

    /// Calls the `getNextEntryPrice` view.
    fn next_entry_price(&self, address: &Address) -> impl Future<Output = SyncResult<U256>> + Send;

    /// Calls the `canEnd` view.
    fn can_end(&self, address: &Address) -> impl Future<Output = SyncResult<bool>> + Send;
}

/// One page of a contract's event log.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventPage {
    /// Events in log order.
    pub events: Vec<RawEvent>,
    /// Cursor to pass to the next fetch.
    pub next_start: u64,
}

/// A contract's append-only event log, addressed by event count.
pub trait EventLog: Send + Sync + 'static {
    /// Number of events the contract has emitted so far.
    fn current_event_count(&self, address: &Address) -> impl Future<Output = SyncResult<u64>> + Send;

    /// Events starting at cursor `start`.
    fn fetch_events(
        &self,
        address: &Address,
        start: u64,
    ) -> impl Future<Output = SyncResult<EventPage>> + Send;
}

/// Payment asset metadata.
pub trait AssetResolver: Send + Sync + 'static {
    /// Resolves display metadata. Unknown assets resolve to the native one.
    fn resolve(&self, asset_id: AssetId) -> impl Future<Output = AssetInfo> + Send;
}
