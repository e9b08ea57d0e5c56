//! # Chain Reaction Watch
//!
//! Follows one subscription against a live node and logs every change.
//!
//! ## Usage
//!
//! ```bash
//! chain_reaction_watch sync.toml game 2A4d...     # one game
//! chain_reaction_watch sync.toml game             # configured legacy game
//! chain_reaction_watch sync.toml registry
//! chain_reaction_watch sync.toml leaderboard
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::process::ExitCode;
use std::sync::Arc;

use chain_reaction_core::{Address, AssetInfo, Clock, SyncError, SyncResult, SystemClock};
use chain_reaction_sync::{
    AssetResolver, GameSubscription, LeaderboardSource, LeaderboardSubscription, NodeClient,
    RegistrySubscription, SyncConfig, TokenListResolver,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Rows of the leaderboard printed per update.
const LEADERBOARD_ROWS: usize = 10;

enum Mode {
    Game(Option<Address>),
    Registry,
    Leaderboard,
}

fn parse_args(args: &[String]) -> Option<(&str, Mode)> {
    let path = args.first()?;
    let mode = match args.get(1).map(String::as_str) {
        None | Some("game") => Mode::Game(args.get(2).map(|a| Address::new(a.as_str()))),
        Some("registry") => Mode::Registry,
        Some("leaderboard") => Mode::Leaderboard,
        Some(_) => return None,
    };
    Some((path.as_str(), mode))
}

fn print_usage() {
    println!("Usage: chain_reaction_watch <config.toml> [game [ADDRESS] | registry | leaderboard]");
    println!();
    println!("Environment:");
    println!("  CHAIN_REACTION_NETWORK   devnet | testnet | mainnet");
    println!("  CHAIN_REACTION_NODE_URL  node base URL");
    println!("  RUST_LOG                 log filter (default: info)");
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((path, mode)) = parse_args(&args) else {
        print_usage();
        return ExitCode::from(2);
    };

    match run(path, mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "watch failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str, mode: Mode) -> SyncResult<()> {
    let config = SyncConfig::load(path)?;
    info!(network = ?config.network, node = config.node_url(), "configuration loaded");

    let node = Arc::new(NodeClient::new(&config)?);
    let assets = Arc::new(TokenListResolver::new(&config)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match mode {
        Mode::Game(address) => {
            let address = address
                .or_else(|| config.legacy_game_address.clone())
                .ok_or_else(|| SyncError::InvalidConfig("no game address given or configured".to_string()))?;
            let subscription = GameSubscription::spawn(node, Arc::clone(&clock), &config, address);

            let mut asset: Option<AssetInfo> = None;
            let mut views = subscription.watch();
            while next_change(&mut views).await {
                let view = views.borrow_and_update().clone();
                let Some(state) = &view.state else {
                    info!(ui = ?view.ui_state(clock.now_ms()), error = ?view.error, "no state yet");
                    continue;
                };
                if asset.as_ref().map(|a| a.id) != Some(state.fields.asset_id) {
                    asset = Some(assets.resolve(state.fields.asset_id).await);
                }
                let asset = asset.get_or_insert_with(AssetInfo::native);
                info!(
                    ui = ?view.ui_state(clock.now_ms()),
                    chain = %state.chain_id(),
                    pot = %asset.display_amount(state.fields.pot),
                    next_entry = %asset.display_amount(state.next_entry_price),
                    players = view.player_count,
                    remaining_ms = state.remaining_ms(clock.now_ms()),
                    source = ?state.source,
                    error = ?view.error,
                    "game"
                );
            }
        }
        Mode::Registry => {
            let subscription = RegistrySubscription::spawn(node, assets, clock, &config);
            let mut views = subscription.watch();
            while next_change(&mut views).await {
                let view = views.borrow_and_update().clone();
                info!(games = view.entries.len(), loading = view.is_loading, error = ?view.error, "registry");
                for entry in &view.entries {
                    let pot = entry.state.as_ref().map(|s| entry.asset.display_amount(s.fields.pot));
                    info!(game_id = entry.game_id, address = %entry.address, pot = ?pot, "  game");
                }
            }
        }
        Mode::Leaderboard => {
            let subscription = LeaderboardSubscription::spawn(node, &config, LeaderboardSource::factory(&config));
            let mut views = subscription.watch();
            while next_change(&mut views).await {
                let view = views.borrow_and_update().clone();
                info!(participants = view.stats.len(), loading = view.is_loading, error = ?view.error, "leaderboard");
                for (rank, stats) in view.stats.iter().take(LEADERBOARD_ROWS).enumerate() {
                    info!(
                        rank = rank + 1,
                        address = %stats.address.shortened(),
                        wins = stats.wins,
                        games = stats.games_played,
                        net = %stats.net_profit(),
                        "  player"
                    );
                }
            }
        }
    }
    info!("stopped");
    Ok(())
}

/// Waits for the next change. `false` on Ctrl-C or a closed subscription.
async fn next_change<T>(views: &mut watch::Receiver<T>) -> bool {
    tokio::select! {
        changed = views.changed() => changed.is_ok(),
        _ = tokio::signal::ctrl_c() => false,
    }
}
