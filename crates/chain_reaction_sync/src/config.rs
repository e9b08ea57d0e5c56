//! # Sync Configuration
//!
//! Loaded once at startup from TOML and passed explicitly to every
//! subscription. There is no global configuration state.
//!
//! ```toml
//! network = "testnet"
//! factory_address = "2A4d..."
//!
//! [polling]
//! event_poll_ms = 4000
//! ```
//!
//! Environment overrides: `CHAIN_REACTION_NETWORK`, `CHAIN_REACTION_NODE_URL`.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chain_reaction_core::events::{
    CHAIN_ENDED, CHAIN_STARTED, CHAIN_TIMEOUT, NEW_GAME_CREATED, PLAYER_JOINED, POT_BOOSTED,
};
use chain_reaction_core::{Address, SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`SyncConfig::network`].
pub const ENV_NETWORK: &str = "CHAIN_REACTION_NETWORK";

/// Environment variable overriding [`SyncConfig::node_url`].
pub const ENV_NODE_URL: &str = "CHAIN_REACTION_NODE_URL";

/// Target network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Local development node.
    #[default]
    Devnet,
    /// Public testnet.
    Testnet,
    /// Mainnet.
    Mainnet,
}

impl Network {
    /// Node URL used when none is configured.
    #[must_use]
    pub const fn default_node_url(self) -> &'static str {
        match self {
            Self::Devnet => "http://127.0.0.1:22973",
            Self::Testnet => "https://node.testnet.alephium.org",
            Self::Mainnet => "https://node.mainnet.alephium.org",
        }
    }

    /// Published token list, if the network has one.
    #[must_use]
    pub const fn default_token_list_url(self) -> Option<&'static str> {
        match self {
            Self::Devnet => None,
            Self::Testnet => {
                Some("https://raw.githubusercontent.com/alephium/token-list/master/tokens/testnet.json")
            }
            Self::Mainnet => {
                Some("https://raw.githubusercontent.com/alephium/token-list/master/tokens/mainnet.json")
            }
        }
    }
}

impl FromStr for Network {
    type Err = SyncError;

    fn from_str(s: &str) -> SyncResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(SyncError::InvalidConfig(format!("unknown network `{other}`"))),
        }
    }
}

/// Polling cadence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Event-log poll interval.
    pub event_poll_ms: u64,
    /// Unconditional state refresh of a watched game.
    pub fallback_refresh_ms: u64,
    /// Re-reconciliation of every registry entry.
    pub registry_refresh_ms: u64,
    /// Silence after which an empty registry or leaderboard stops loading.
    pub loading_timeout_ms: u64,
    /// Events requested per page.
    pub page_limit: u32,
    /// HTTP request timeout.
    pub request_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            event_poll_ms: 4_000,
            fallback_refresh_ms: 15_000,
            registry_refresh_ms: 15_000,
            loading_timeout_ms: 5_000,
            page_limit: 100,
            request_timeout_ms: 10_000,
        }
    }
}

impl PollingConfig {
    /// Event-log poll interval.
    #[must_use]
    pub const fn event_poll(&self) -> Duration {
        Duration::from_millis(self.event_poll_ms)
    }

    /// Fallback refresh interval.
    #[must_use]
    pub const fn fallback_refresh(&self) -> Duration {
        Duration::from_millis(self.fallback_refresh_ms)
    }

    /// Registry refresh interval.
    #[must_use]
    pub const fn registry_refresh(&self) -> Duration {
        Duration::from_millis(self.registry_refresh_ms)
    }

    /// Loading silence timeout.
    #[must_use]
    pub const fn loading_timeout(&self) -> Duration {
        Duration::from_millis(self.loading_timeout_ms)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Contract ABI tables the node client needs to name events and call views.
///
/// The node reports events by declaration index; these lists map the index
/// back to a name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbiConfig {
    /// Game contract events, in declaration order.
    pub game_events: Vec<String>,
    /// Factory contract events, in declaration order.
    pub factory_events: Vec<String>,
    /// Method index of `getNextEntryPrice`.
    pub next_entry_price_method: u32,
    /// Method index of `canEnd`.
    pub can_end_method: u32,
}

impl Default for AbiConfig {
    fn default() -> Self {
        let names = |list: &[&str]| -> Vec<String> { list.iter().map(ToString::to_string).collect() };
        Self {
            game_events: names(&[CHAIN_STARTED, PLAYER_JOINED, CHAIN_ENDED, CHAIN_TIMEOUT, POT_BOOSTED]),
            factory_events: names(&[
                NEW_GAME_CREATED,
                CHAIN_STARTED,
                PLAYER_JOINED,
                CHAIN_ENDED,
                CHAIN_TIMEOUT,
                POT_BOOSTED,
            ]),
            next_entry_price_method: 0,
            can_end_method: 1,
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Target network.
    #[serde(default)]
    pub network: Network,
    /// Node URL; the network's default when absent.
    #[serde(default)]
    pub node_url: Option<String>,
    /// Address group used for view calls.
    #[serde(default)]
    pub group: u32,
    /// Factory contract address.
    pub factory_address: Address,
    /// Standalone first-version game, if one is deployed.
    #[serde(default)]
    pub legacy_game_address: Option<Address>,
    /// Token list URL; the network's default when absent.
    #[serde(default)]
    pub token_list_url: Option<String>,
    /// Polling cadence.
    #[serde(default)]
    pub polling: PollingConfig,
    /// ABI tables.
    #[serde(default)]
    pub abi: AbiConfig,
}

impl SyncConfig {
    /// A configuration with defaults for everything but the factory.
    #[must_use]
    pub fn new(network: Network, factory_address: Address) -> Self {
        Self {
            network,
            node_url: None,
            group: 0,
            factory_address,
            legacy_game_address: None,
            token_list_url: None,
            polling: PollingConfig::default(),
            abi: AbiConfig::default(),
        }
    }

    /// Loads, applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read or parsed, or the
    /// result fails validation.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SyncError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&text)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML without overrides or validation.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML or missing required keys.
    pub fn from_toml_str(text: &str) -> SyncResult<Self> {
        toml::from_str(text).map_err(|e| SyncError::InvalidConfig(e.to_string()))
    }

    /// Applies overrides from a variable lookup (normally the environment).
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an unknown network name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> SyncResult<()> {
        if let Some(network) = lookup(ENV_NETWORK) {
            self.network = network.parse()?;
        }
        if let Some(url) = lookup(ENV_NODE_URL) {
            self.node_url = Some(url);
        }
        Ok(())
    }

    /// Checks intervals and addresses.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending key.
    pub fn validate(&self) -> SyncResult<()> {
        let p = &self.polling;
        let intervals = [
            ("polling.event_poll_ms", p.event_poll_ms),
            ("polling.fallback_refresh_ms", p.fallback_refresh_ms),
            ("polling.registry_refresh_ms", p.registry_refresh_ms),
            ("polling.loading_timeout_ms", p.loading_timeout_ms),
            ("polling.request_timeout_ms", p.request_timeout_ms),
        ];
        if let Some((key, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(SyncError::InvalidConfig(format!("{key} must be positive")));
        }
        if p.page_limit == 0 {
            return Err(SyncError::InvalidConfig("polling.page_limit must be positive".to_string()));
        }
        if self.factory_address.as_str().is_empty() {
            return Err(SyncError::InvalidConfig("factory_address is empty".to_string()));
        }
        if self.node_url().is_empty() {
            return Err(SyncError::InvalidConfig("node_url is empty".to_string()));
        }
        Ok(())
    }

    /// Effective node URL, without a trailing slash.
    #[must_use]
    pub fn node_url(&self) -> &str {
        self.node_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_node_url())
            .trim_end_matches('/')
    }

    /// Effective token list URL.
    #[must_use]
    pub fn token_list_url(&self) -> Option<&str> {
        self.token_list_url
            .as_deref()
            .or_else(|| self.network.default_token_list_url())
    }
}
