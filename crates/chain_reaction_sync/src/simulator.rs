//! # Simulated Node
//!
//! Deterministic in-memory node for tests and demos. Stores raw contract
//! state in either layout, keeps an append-only event log per address and
//! can inject the failures a real node produces (offline, failed polls).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chain_reaction_core::legacy::encode_legacy;
use chain_reaction_core::schema::{decode_canonical, encode_canonical};
use chain_reaction_core::{
    Address, AssetId, AssetInfo, Clock, ContractFields, EventIdentity, FieldValue, GameState,
    RawEvent, RawState, StateSource, SyncError, SyncResult, TxId, B256, U256,
};
use parking_lot::Mutex;

use crate::remote::{AssetResolver, EventLog, EventPage, StateQuery};

/// Factory id written into canonical immutable fields.
const SIM_FACTORY_ID: B256 = B256::new([0xfa; 32]);

/// Default events per page.
const DEFAULT_PAGE_LIMIT: usize = 100;

/// An event about to be appended to a log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimEvent {
    /// Event name.
    pub name: &'static str,
    /// Positional fields.
    pub fields: Vec<FieldValue>,
}

struct SimState {
    contracts: HashMap<Address, (StateSource, RawState)>,
    logs: HashMap<Address, Vec<RawEvent>>,
    assets: HashMap<AssetId, AssetInfo>,
    offline: bool,
    failing_polls: u32,
    failing_count: bool,
    next_tx: u64,
    state_fetches: u64,
    state_stall: Option<Duration>,
    page_limit: usize,
}

/// In-memory node implementing every remote interface.
pub struct SimulatedNode {
    clock: Arc<dyn Clock>,
    inner: Mutex<SimState>,
}

impl SimulatedNode {
    /// Creates an empty node. `clock` drives the canonical `canEnd` view.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(SimState {
                contracts: HashMap::new(),
                logs: HashMap::new(),
                assets: HashMap::new(),
                offline: false,
                failing_polls: 0,
                failing_count: false,
                next_tx: 1,
                state_fetches: 0,
                state_stall: None,
                page_limit: DEFAULT_PAGE_LIMIT,
            }),
        }
    }

    // =========================================================================
    // CONTRACTS
    // =========================================================================

    /// Deploys a current-version contract at `address`.
    pub fn deploy_canonical(&self, address: &Address, fields: ContractFields) {
        let raw = encode_canonical(&fields, SIM_FACTORY_ID);
        self.inner
            .lock()
            .contracts
            .insert(address.clone(), (StateSource::Canonical, raw));
    }

    /// Deploys a first-version contract at `address`.
    pub fn deploy_legacy(&self, address: &Address, fields: ContractFields) {
        let raw = encode_legacy(&fields);
        self.inner
            .lock()
            .contracts
            .insert(address.clone(), (StateSource::Legacy, raw));
    }

    /// Rewrites a deployed contract's fields, keeping its layout.
    pub fn update_fields(&self, address: &Address, fields: ContractFields) {
        let mut inner = self.inner.lock();
        if let Some((layout, raw)) = inner.contracts.get_mut(address) {
            *raw = match layout {
                StateSource::Canonical => encode_canonical(&fields, SIM_FACTORY_ID),
                StateSource::Legacy => encode_legacy(&fields),
            };
        }
    }

    /// Edits a contract's raw field lists directly.
    pub fn edit_raw_state(&self, address: &Address, edit: impl FnOnce(&mut RawState)) {
        if let Some((_, raw)) = self.inner.lock().contracts.get_mut(address) {
            edit(raw);
        }
    }

    /// Registers asset metadata for [`AssetResolver::resolve`].
    pub fn register_asset(&self, asset: AssetInfo) {
        self.inner.lock().assets.insert(asset.id, asset);
    }

    // =========================================================================
    // EVENT LOG
    // =========================================================================

    /// Appends one event in a fresh transaction.
    pub fn emit(&self, address: &Address, event: SimEvent) -> EventIdentity {
        let tx_id = self.emit_batch(address, vec![event]);
        EventIdentity::new(tx_id, 0)
    }

    /// Appends events that share one transaction, indexed `0..`.
    pub fn emit_batch(&self, address: &Address, events: Vec<SimEvent>) -> TxId {
        let mut inner = self.inner.lock();
        let tx_id = tx_id(inner.next_tx);
        inner.next_tx += 1;

        let log = inner.logs.entry(address.clone()).or_default();
        for (index, event) in (0i32..).zip(events) {
            log.push(RawEvent {
                tx_id,
                event_index: index,
                name: event.name.to_string(),
                fields: event.fields,
            });
        }
        tx_id
    }

    /// Appends a copy of the event at log position `position`, the way an
    /// overlapping page redelivers it.
    pub fn redeliver(&self, address: &Address, position: usize) {
        let mut inner = self.inner.lock();
        if let Some(log) = inner.logs.get_mut(address) {
            if let Some(event) = log.get(position).cloned() {
                log.push(event);
            }
        }
    }

    /// Number of events in `address`'s log.
    #[must_use]
    pub fn event_count(&self, address: &Address) -> usize {
        self.inner.lock().logs.get(address).map_or(0, Vec::len)
    }

    /// Sets how many events a single page carries.
    pub fn set_page_limit(&self, limit: usize) {
        self.inner.lock().page_limit = limit.max(1);
    }

    // =========================================================================
    // FAILURE INJECTION
    // =========================================================================

    /// Makes every call fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Fails the next `count` event fetches.
    pub fn fail_next_polls(&self, count: u32) {
        self.inner.lock().failing_polls = count;
    }

    /// Makes the current-count call fail.
    pub fn fail_event_count(&self, failing: bool) {
        self.inner.lock().failing_count = failing;
    }

    /// Holds the next canonical field fetch for `delay` after it has read
    /// the contract, the way a slow node answers with stale data.
    pub fn stall_next_state_fetch(&self, delay: Duration) {
        self.inner.lock().state_stall = Some(delay);
    }

    /// Canonical state fetches served so far.
    #[must_use]
    pub fn state_fetches(&self) -> u64 {
        self.inner.lock().state_fetches
    }

    fn canonical_state(&self, address: &Address) -> SyncResult<GameState> {
        let inner = self.inner.lock();
        check_online(&inner)?;
        match inner.contracts.get(address) {
            Some((StateSource::Canonical, raw)) => {
                let fields = decode_canonical(raw)?;
                Ok(GameState::derive_locally(fields, self.clock.now_ms(), StateSource::Canonical))
            }
            Some((StateSource::Legacy, _)) => Err(SyncError::TransientFetch(format!(
                "contract {address} has no such method"
            ))),
            None => Err(not_found(address)),
        }
    }
}

fn tx_id(counter: u64) -> TxId {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&counter.to_be_bytes());
    B256::new(bytes)
}

fn check_online(state: &SimState) -> SyncResult<()> {
    if state.offline {
        return Err(SyncError::TransientFetch("node offline".to_string()));
    }
    Ok(())
}

fn not_found(address: &Address) -> SyncError {
    SyncError::TransientFetch(format!("contract {address} not found"))
}

impl StateQuery for SimulatedNode {
    async fn contract_fields(&self, address: &Address) -> SyncResult<ContractFields> {
        let (fields, stall) = {
            let mut inner = self.inner.lock();
            check_online(&inner)?;
            inner.state_fetches += 1;
            let (_, raw) = inner.contracts.get(address).ok_or_else(|| not_found(address))?;
            let fields = decode_canonical(raw);
            (fields, inner.state_stall.take())
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        fields
    }

    async fn raw_state(&self, address: &Address) -> SyncResult<RawState> {
        let inner = self.inner.lock();
        check_online(&inner)?;
        inner
            .contracts
            .get(address)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| not_found(address))
    }

    async fn next_entry_price(&self, address: &Address) -> SyncResult<U256> {
        Ok(self.canonical_state(address)?.next_entry_price)
    }

    async fn can_end(&self, address: &Address) -> SyncResult<bool> {
        Ok(self.canonical_state(address)?.can_end)
    }
}

impl EventLog for SimulatedNode {
    async fn current_event_count(&self, address: &Address) -> SyncResult<u64> {
        let inner = self.inner.lock();
        check_online(&inner)?;
        if inner.failing_count {
            return Err(SyncError::TransientFetch("current-count unavailable".to_string()));
        }
        Ok(inner.logs.get(address).map_or(0, Vec::len) as u64)
    }

    async fn fetch_events(&self, address: &Address, start: u64) -> SyncResult<EventPage> {
        let mut inner = self.inner.lock();
        check_online(&inner)?;
        if inner.failing_polls > 0 {
            inner.failing_polls -= 1;
            return Err(SyncError::TransientFetch("event poll failed".to_string()));
        }

        let limit = inner.page_limit;
        let log = inner.logs.get(address).map_or(&[][..], Vec::as_slice);
        let from = usize::try_from(start).unwrap_or(usize::MAX).min(log.len());
        let to = from.saturating_add(limit).min(log.len());
        let events = log[from..to].to_vec();
        Ok(EventPage {
            next_start: start + events.len() as u64,
            events,
        })
    }
}

impl AssetResolver for SimulatedNode {
    async fn resolve(&self, asset_id: AssetId) -> AssetInfo {
        self.inner
            .lock()
            .assets
            .get(&asset_id)
            .cloned()
            .unwrap_or_else(AssetInfo::native)
    }
}

/// Sample contracts and events.
pub mod fixtures {
    use chain_reaction_core::events::{
        CHAIN_ENDED, CHAIN_STARTED, CHAIN_TIMEOUT, NEW_GAME_CREATED, PLAYER_JOINED, POT_BOOSTED,
    };
    use chain_reaction_core::{Address, Bps, ContractFields, ContractId, FieldValue, B256, U256};

    use super::SimEvent;

    /// An active game: epoch 4, three participants, base 100 at 500 bps,
    /// ending at t = 10 000.
    #[must_use]
    pub fn active_fields() -> ContractFields {
        ContractFields {
            chain_id: U256::from(4u64),
            current_entry: U256::from(110u64),
            last_player: Address::new("1PlayerThree"),
            last_entry_timestamp: 5_000,
            pot: U256::from(315u64),
            boost_amount: U256::ZERO,
            is_active: true,
            player_count: 3,
            end_timestamp: 10_000,
            base_entry: U256::from(100u64),
            multiplier: Bps::new(500).unwrap_or(Bps::ZERO),
            duration_ms: 3_600_000,
            duration_decrease_ms: 60_000,
            min_duration_ms: 60_000,
            asset_id: B256::ZERO,
            burn_rate: Bps::new(100).unwrap_or(Bps::ZERO),
            burned_amount: U256::from(3u64),
        }
    }

    /// `ChainStarted`.
    #[must_use]
    pub fn chain_started(chain_id: u64, starter: &str) -> SimEvent {
        SimEvent {
            name: CHAIN_STARTED,
            fields: vec![
                FieldValue::u256(U256::from(chain_id)),
                FieldValue::address(&Address::new(starter)),
            ],
        }
    }

    /// `PlayerJoined`.
    #[must_use]
    pub fn player_joined(chain_id: u64, player: &str, position: u64, fee: u64, burned: u64) -> SimEvent {
        SimEvent {
            name: PLAYER_JOINED,
            fields: vec![
                FieldValue::u256(U256::from(chain_id)),
                FieldValue::address(&Address::new(player)),
                FieldValue::u256(U256::from(position)),
                FieldValue::u256(U256::from(fee)),
                FieldValue::u256(U256::from(burned)),
            ],
        }
    }

    /// `ChainEnded`.
    #[must_use]
    pub fn chain_ended(chain_id: u64, winner: &str, payout: u64) -> SimEvent {
        SimEvent {
            name: CHAIN_ENDED,
            fields: vec![
                FieldValue::u256(U256::from(chain_id)),
                FieldValue::address(&Address::new(winner)),
                FieldValue::u256(U256::from(payout)),
            ],
        }
    }

    /// `ChainTimeout`.
    #[must_use]
    pub fn chain_timeout(chain_id: u64) -> SimEvent {
        SimEvent {
            name: CHAIN_TIMEOUT,
            fields: vec![FieldValue::u256(U256::from(chain_id))],
        }
    }

    /// `PotBoosted`.
    #[must_use]
    pub fn pot_boosted(chain_id: u64, booster: &str, amount: u64) -> SimEvent {
        SimEvent {
            name: POT_BOOSTED,
            fields: vec![
                FieldValue::u256(U256::from(chain_id)),
                FieldValue::address(&Address::new(booster)),
                FieldValue::u256(U256::from(amount)),
            ],
        }
    }

    /// Factory `NewGameCreated`.
    #[must_use]
    pub fn new_game_created(contract_id: ContractId, game_id: u64) -> SimEvent {
        SimEvent {
            name: NEW_GAME_CREATED,
            fields: vec![
                FieldValue::bytes32(contract_id.0),
                FieldValue::u256(U256::from(game_id)),
            ],
        }
    }
}
