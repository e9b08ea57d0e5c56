//! # Subscription Scenarios
//!
//! End-to-end runs of the game, registry and leaderboard subscriptions
//! against the in-memory node, on tokio's paused clock.
//!
//! Run with: cargo test -p chain_reaction_sync --test subscription_scenarios

use std::sync::Arc;
use std::time::Duration;

use chain_reaction_core::{
    Address, AssetInfo, Clock, ContractId, ManualClock, StateSource, SyncError, UiState, B256, U256,
};
use chain_reaction_sync::simulator::fixtures;
use chain_reaction_sync::{
    GameSubscription, LeaderboardSort, LeaderboardSource, LeaderboardSubscription, Network,
    RegistrySubscription, SimulatedNode, SyncConfig,
};

const EVENT_POLL: Duration = Duration::from_millis(4_000);

// ============================================================================
// HARNESS
// ============================================================================

fn config() -> SyncConfig {
    SyncConfig::new(Network::Devnet, Address::new("2AFactory"))
}

fn world(now_ms: u64) -> (Arc<ManualClock>, Arc<SimulatedNode>) {
    let clock = Arc::new(ManualClock::new(now_ms));
    let node = Arc::new(SimulatedNode::new(clock.clone()));
    (clock, node)
}

/// Lets every ready task run without reaching the next poll.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Advances past the next event poll.
async fn next_poll() {
    tokio::time::sleep(EVENT_POLL).await;
}

fn game_address() -> Address {
    Address::new("1GameContract")
}

fn seed_history(node: &SimulatedNode, address: &Address) {
    node.emit(address, fixtures::chain_started(4, "1PlayerOne"));
    node.emit(address, fixtures::player_joined(4, "1PlayerOne", 1, 100, 1));
    node.emit(address, fixtures::player_joined(4, "1PlayerTwo", 2, 105, 1));
    node.emit(address, fixtures::player_joined(4, "1PlayerThree", 3, 110, 1));
}

// ============================================================================
// GAME SUBSCRIPTION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_initial_load_and_ledger_history() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    seed_history(&node, &address);

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    assert!(subscription.view().is_loading);
    assert_eq!(subscription.view().ui_state(1_000), UiState::Loading);

    settle().await;
    let view = subscription.view();
    assert!(!view.is_loading);
    assert_eq!(view.error, None);
    let state = view.state.as_ref().unwrap();
    assert_eq!(state.source, StateSource::Canonical);
    assert_eq!(state.next_entry_price, U256::from(115u64));
    assert_eq!(view.player_count, 3);
    let positions: Vec<u64> = view.players.iter().map(|p| p.position).collect();
    assert_eq!(positions, [1, 2, 3]);
    assert_eq!(view.ui_state(1_000), UiState::Active);
    assert_eq!(subscription.address(), &address);
}

#[tokio::test(start_paused = true)]
async fn test_join_event_triggers_refresh() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    seed_history(&node, &address);

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    assert_eq!(node.state_fetches(), 1);

    let mut fields = fixtures::active_fields();
    fields.player_count = 4;
    fields.current_entry = U256::from(115u64);
    node.update_fields(&address, fields);
    node.emit(&address, fixtures::player_joined(4, "1PlayerFour", 4, 115, 1));

    next_poll().await;
    let view = subscription.view();
    assert_eq!(node.state_fetches(), 2);
    let state = view.state.as_ref().unwrap();
    assert_eq!(state.fields.player_count, 4);
    assert_eq!(state.next_entry_price, U256::from(120u64));
    assert_eq!(view.player_count, 4);
}

#[tokio::test(start_paused = true)]
async fn test_non_trigger_events_do_not_refresh() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());

    let _subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    node.emit(&address, fixtures::new_game_created(ContractId(B256::repeat_byte(9)), 1));

    next_poll().await;
    assert_eq!(node.state_fetches(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_redelivered_event_is_ignored() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    seed_history(&node, &address);

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    node.emit(&address, fixtures::pot_boosted(4, "1Booster", 50));
    next_poll().await;
    assert_eq!(node.state_fetches(), 2);

    node.redeliver(&address, 4);
    next_poll().await;
    assert_eq!(node.state_fetches(), 2);

    // An old join the ledger already holds.
    node.redeliver(&address, 1);
    next_poll().await;
    let view = subscription.view();
    assert_eq!(view.player_count, 3);
    assert_eq!(view.players[0].address, Address::new("1PlayerOne"));
}

#[tokio::test(start_paused = true)]
async fn test_chain_start_clears_ledger() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    seed_history(&node, &address);

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    assert_eq!(subscription.view().player_count, 3);

    node.emit(&address, fixtures::chain_ended(4, "1PlayerThree", 300));
    node.emit(&address, fixtures::chain_started(5, "1PlayerNew"));
    node.emit(&address, fixtures::player_joined(5, "1PlayerNew", 1, 100, 1));
    next_poll().await;

    let view = subscription.view();
    assert_eq!(view.player_count, 1);
    assert_eq!(view.players[0].epoch, U256::from(5u64));
    assert_eq!(view.players[0].address, Address::new("1PlayerNew"));
}

#[tokio::test(start_paused = true)]
async fn test_previous_epoch_join_redelivered_after_start_is_dropped() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    seed_history(&node, &address);

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    node.emit(&address, fixtures::chain_started(5, "1PlayerNew"));
    next_poll().await;
    assert_eq!(subscription.view().player_count, 0);

    // 1PlayerTwo's epoch-4 join, after the ledger's session was reset.
    node.redeliver(&address, 2);
    next_poll().await;
    let view = subscription.view();
    assert_eq!(view.player_count, 0);
    assert!(view.players.is_empty());

    node.emit(&address, fixtures::player_joined(5, "1PlayerNew", 1, 100, 1));
    next_poll().await;
    let view = subscription.view();
    assert_eq!(view.player_count, 1);
    assert_eq!(view.players[0].epoch, U256::from(5u64));
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_requests_coalesce() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    node.stall_next_state_fetch(Duration::from_secs(2));

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    assert_eq!(node.state_fetches(), 1);

    let mut fields = fixtures::active_fields();
    fields.pot = U256::from(777u64);
    node.update_fields(&address, fields);
    for _ in 0..200 {
        subscription.refresh();
    }

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(node.state_fetches(), 2);
    assert_eq!(subscription.view().state.unwrap().fields.pot, U256::from(777u64));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_refresh_without_events() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;

    let mut fields = fixtures::active_fields();
    fields.pot = U256::from(999u64);
    node.update_fields(&address, fields);

    tokio::time::sleep(config().polling.fallback_refresh()).await;
    assert_eq!(node.state_fetches(), 2);
    assert_eq!(subscription.view().state.unwrap().fields.pot, U256::from(999u64));
}

#[tokio::test(start_paused = true)]
async fn test_legacy_contract_and_clock_driven_claim() {
    let (clock, node) = world(1_000);
    let address = Address::new("1LegacyGame");
    node.deploy_legacy(&address, fixtures::active_fields());

    let subscription = GameSubscription::spawn(node.clone(), clock.clone(), &config(), address);
    settle().await;

    let view = subscription.view();
    let state = view.state.as_ref().unwrap();
    assert_eq!(state.source, StateSource::Legacy);
    assert!(!state.can_end);
    assert_eq!(state.next_entry_price, U256::from(115u64));
    assert_eq!(view.ui_state(clock.now_ms()), UiState::Active);

    // No refresh needed: the wall clock alone crosses the end.
    clock.set(10_000);
    assert_eq!(view.ui_state(clock.now_ms()), UiState::Claimable);
}

#[tokio::test(start_paused = true)]
async fn test_short_legacy_state_keeps_cached_snapshot() {
    let (clock, node) = world(1_000);
    let address = Address::new("1LegacyGame");
    node.deploy_legacy(&address, fixtures::active_fields());

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    let before = subscription.view().state;
    assert!(before.is_some());

    node.edit_raw_state(&address, |raw| raw.mutable.truncate(3));
    subscription.refresh();
    settle().await;

    let view = subscription.view();
    assert_eq!(view.state, before);
    assert!(view.error.as_deref().unwrap().contains("schema mismatch"));
    assert_eq!(view.ui_state(1_000), UiState::Error);
}

#[tokio::test(start_paused = true)]
async fn test_offline_node_surfaces_error_then_recovers() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;

    node.set_offline(true);
    subscription.refresh();
    settle().await;
    let view = subscription.view();
    assert!(view.state.is_some());
    assert!(view.error.is_some());

    node.set_offline(false);
    subscription.refresh();
    settle().await;
    assert_eq!(subscription.view().error, None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_is_retried() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());
    node.fail_event_count(true);

    let subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    // The state poller fell back to cursor 0 and the history replays harmlessly.
    seed_history(&node, &address);
    node.fail_next_polls(2);

    next_poll().await;
    assert_eq!(subscription.view().error, None);
    next_poll().await;
    assert_eq!(subscription.view().player_count, 3);
    assert!(node.state_fetches() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_everything() {
    let (clock, node) = world(1_000);
    let address = game_address();
    node.deploy_canonical(&address, fixtures::active_fields());

    let mut subscription = GameSubscription::spawn(node.clone(), clock, &config(), address.clone());
    settle().await;
    let fetches = node.state_fetches();
    let view = subscription.view();

    subscription.cancel();
    assert!(!subscription.is_live());
    node.emit(&address, fixtures::player_joined(4, "1Late", 4, 115, 1));
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(node.state_fetches(), fetches);
    assert_eq!(subscription.view(), view);
}

// ============================================================================
// REGISTRY SUBSCRIPTION
// ============================================================================

fn usdt() -> AssetInfo {
    AssetInfo {
        id: B256::repeat_byte(0x55),
        name: "Tether USD".to_string(),
        symbol: "USDT".to_string(),
        decimals: 6,
        icon_url: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_registry_discovers_and_sorts() {
    let (clock, node) = world(1_000);
    let config = config();

    let first = ContractId(B256::repeat_byte(0x11));
    let second = ContractId(B256::repeat_byte(0x22));
    node.deploy_canonical(&first.to_address(), fixtures::active_fields());
    let mut token_game = fixtures::active_fields();
    token_game.asset_id = usdt().id;
    node.deploy_canonical(&second.to_address(), token_game);
    node.register_asset(usdt());

    node.emit(&config.factory_address, fixtures::new_game_created(first, 1));
    node.emit(&config.factory_address, fixtures::new_game_created(second, 2));

    let subscription = RegistrySubscription::spawn(node.clone(), node.clone(), clock, &config);
    settle().await;

    let view = subscription.view();
    assert!(!view.is_loading);
    let ids: Vec<u64> = view.entries.iter().map(|e| e.game_id).collect();
    assert_eq!(ids, [2, 1]);
    assert!(view.entries.iter().all(|e| e.state.is_some()));
    assert_eq!(view.entries[0].asset.symbol, "USDT");
    assert!(view.entries[1].asset.is_native());
}

#[tokio::test(start_paused = true)]
async fn test_registry_lists_unreachable_game_then_fills_it() {
    let (clock, node) = world(1_000);
    let config = config();
    let pending = ContractId(B256::repeat_byte(0x33));
    node.emit(&config.factory_address, fixtures::new_game_created(pending, 3));

    let subscription = RegistrySubscription::spawn(node.clone(), node.clone(), clock, &config);
    settle().await;
    let view = subscription.view();
    assert_eq!(view.entries.len(), 1);
    assert!(view.entries[0].state.is_none());
    assert_eq!(view.entries[0].address, pending.to_address());

    node.deploy_canonical(&pending.to_address(), fixtures::active_fields());
    tokio::time::sleep(config.polling.registry_refresh()).await;
    assert!(subscription.view().entries[0].state.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_registry_slow_refresh_never_overwrites_newer_state() {
    let (clock, node) = world(1_000);
    let config = config();
    let game = ContractId(B256::repeat_byte(0x44));
    node.deploy_canonical(&game.to_address(), fixtures::active_fields());
    node.emit(&config.factory_address, fixtures::new_game_created(game, 4));

    let subscription = RegistrySubscription::spawn(node.clone(), node.clone(), clock, &config);
    settle().await;
    assert_eq!(node.state_fetches(), 1);
    let pot = |subscription: &RegistrySubscription| {
        subscription.view().entries[0].state.as_ref().unwrap().fields.pot
    };

    // The 15 s refresh reads pot 315 and then hangs for 20 s.
    let mut fields = fixtures::active_fields();
    fields.pot = U256::from(315u64);
    node.update_fields(&game.to_address(), fields.clone());
    node.stall_next_state_fetch(Duration::from_secs(20));
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(node.state_fetches(), 2);

    // The 30 s refresh waits for the stalled one instead of racing it.
    fields.pot = U256::from(999u64);
    node.update_fields(&game.to_address(), fields);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(node.state_fetches(), 2);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(node.state_fetches(), 3);
    assert_eq!(pot(&subscription), U256::from(999u64));

    tokio::time::sleep(config.polling.registry_refresh()).await;
    assert_eq!(pot(&subscription), U256::from(999u64));
}

#[tokio::test(start_paused = true)]
async fn test_registry_loading_clears_after_silence() {
    let (clock, node) = world(1_000);
    let config = config();

    let subscription = RegistrySubscription::spawn(node.clone(), node.clone(), clock, &config);
    settle().await;
    assert!(subscription.view().is_loading);

    tokio::time::sleep(config.polling.loading_timeout()).await;
    let view = subscription.view();
    assert!(!view.is_loading);
    assert!(view.entries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_registry_poll_error_clears_on_success() {
    let (clock, node) = world(1_000);
    let config = config();
    node.fail_next_polls(1);

    let mut subscription = RegistrySubscription::spawn(node.clone(), node.clone(), clock, &config);
    settle().await;
    let view = subscription.view();
    assert!(!view.is_loading);
    assert!(view.error.is_some());

    next_poll().await;
    assert_eq!(subscription.view().error, None);

    subscription.cancel();
    assert!(!subscription.is_live());
}

// ============================================================================
// LEADERBOARD SUBSCRIPTION
// ============================================================================

fn seed_results(node: &SimulatedNode, address: &Address) {
    node.emit(address, fixtures::player_joined(1, "1Alice", 1, 100, 2));
    node.emit(address, fixtures::player_joined(1, "1Bob", 2, 105, 2));
    node.emit(address, fixtures::chain_ended(1, "1Bob", 400));
    node.emit(address, fixtures::player_joined(2, "1Alice", 1, 100, 2));
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_from_factory_stream() {
    let (_, node) = world(1_000);
    let config = config();
    seed_results(&node, &config.factory_address);

    let subscription =
        LeaderboardSubscription::spawn(node.clone(), &config, LeaderboardSource::factory(&config));
    settle().await;

    let view = subscription.view();
    assert!(!view.is_loading);
    assert_eq!(view.stats.len(), 2);
    let bob = &view.stats[0];
    assert_eq!(bob.address, Address::new("1Bob"));
    assert_eq!(bob.wins, 1);
    assert_eq!(bob.total_payout, U256::from(400u64));
    assert_eq!(bob.total_spent, U256::from(107u64));

    let by_games = view.ranked(LeaderboardSort::GamesPlayed);
    assert_eq!(by_games[0].address, Address::new("1Alice"));
    assert_eq!(by_games[0].games_played, 2);
    assert_eq!(by_games[0].total_spent, U256::from(204u64));
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_replay_is_idempotent() {
    let (_, node) = world(1_000);
    let config = config();
    let factory = config.factory_address.clone();
    seed_results(&node, &factory);

    let subscription =
        LeaderboardSubscription::spawn(node.clone(), &config, LeaderboardSource::factory(&config));
    settle().await;
    let before = subscription.view().stats;

    for position in 0..4 {
        node.redeliver(&factory, position);
    }
    next_poll().await;
    assert_eq!(subscription.view().stats, before);
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_from_contract_streams() {
    let (_, node) = world(1_000);
    let config = config();
    let (a, b) = (Address::new("1GameA"), Address::new("1GameB"));
    node.emit(&a, fixtures::player_joined(1, "1Alice", 1, 100, 0));
    node.emit(&b, fixtures::player_joined(1, "1Alice", 1, 50, 0));
    node.emit(&b, fixtures::chain_ended(1, "1Alice", 500));

    let subscription =
        LeaderboardSubscription::spawn(node.clone(), &config, LeaderboardSource::Contracts(vec![a, b]));
    settle().await;

    let view = subscription.view();
    assert_eq!(view.stats.len(), 1);
    let alice = &view.stats[0];
    assert_eq!(alice.games_played, 2);
    assert_eq!(alice.total_spent, U256::from(150u64));
    assert_eq!(alice.wins, 1);
}

#[tokio::test(start_paused = true)]
async fn test_leaderboard_offline_sets_error() {
    let (_, node) = world(1_000);
    let config = config();
    node.set_offline(true);

    let subscription =
        LeaderboardSubscription::spawn(node.clone(), &config, LeaderboardSource::factory(&config));
    settle().await;
    let view = subscription.view();
    assert!(!view.is_loading);
    assert!(view.error.is_some());

    node.set_offline(false);
    next_poll().await;
    assert_eq!(subscription.view().error, None);
}

#[test]
fn test_error_kinds_are_transient_or_not() {
    assert!(SyncError::TransientFetch("timeout".to_string()).is_transient());
    assert!(!SyncError::schema("mutFields", "short").is_transient());
}
