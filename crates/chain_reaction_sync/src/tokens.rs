//! # Token List Resolver
//!
//! [`AssetResolver`] backed by the network's published token list.
//!
//! The list is fetched on first use and cached after the first success.
//! A failed fetch is not cached, so the next lookup retries. The native
//! asset always resolves, and anything unknown falls back to it.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chain_reaction_core::{AssetId, AssetInfo, SyncError, SyncResult, B256};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::node::transient;
use crate::node::wire::{TokenDto, TokenListResponse};
use crate::remote::AssetResolver;

type TokenMap = Arc<HashMap<AssetId, AssetInfo>>;

/// Cached token-list lookups.
pub struct TokenListResolver {
    source: Option<TokenSource>,
    cache: RwLock<Option<TokenMap>>,
}

struct TokenSource {
    http: reqwest::Client,
    url: String,
}

impl TokenListResolver {
    /// Builds a resolver for the configured network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let source = match config.token_list_url() {
            Some(url) => {
                let http = reqwest::Client::builder()
                    .timeout(config.polling.request_timeout())
                    .build()
                    .map_err(|e| SyncError::InvalidConfig(format!("http client: {e}")))?;
                Some(TokenSource {
                    http,
                    url: url.to_string(),
                })
            }
            None => None,
        };
        Ok(Self {
            source,
            cache: RwLock::new(None),
        })
    }

    /// A resolver with a fixed list and no remote source.
    #[must_use]
    pub fn with_assets(assets: impl IntoIterator<Item = AssetInfo>) -> Self {
        Self {
            source: None,
            cache: RwLock::new(Some(Arc::new(index(assets)))),
        }
    }

    async fn tokens(&self) -> Option<TokenMap> {
        let cached = self.cache.read().clone();
        if cached.is_some() {
            return cached;
        }
        let source = self.source.as_ref()?;
        let url = source.url.as_str();

        match source.fetch().await {
            Ok(tokens) => {
                debug!(url, count = tokens.len(), "token list loaded");
                let tokens = Arc::new(tokens);
                *self.cache.write() = Some(Arc::clone(&tokens));
                Some(tokens)
            }
            Err(e) => {
                warn!(url, error = %e, "token list unavailable, using native asset only");
                None
            }
        }
    }
}

impl TokenSource {
    async fn fetch(&self) -> SyncResult<HashMap<AssetId, AssetInfo>> {
        let response: TokenListResponse = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| transient(&e))?
            .json()
            .await
            .map_err(|e| transient(&e))?;
        Ok(index(response.tokens.into_iter().filter_map(asset_from_dto)))
    }
}

fn asset_from_dto(dto: TokenDto) -> Option<AssetInfo> {
    let id = B256::from_str(&dto.id).ok()?;
    Some(AssetInfo {
        id,
        name: dto.name,
        symbol: dto.symbol,
        decimals: dto.decimals,
        icon_url: dto.logo_uri,
    })
}

fn index(assets: impl IntoIterator<Item = AssetInfo>) -> HashMap<AssetId, AssetInfo> {
    let mut map: HashMap<AssetId, AssetInfo> = assets.into_iter().map(|a| (a.id, a)).collect();
    map.entry(B256::ZERO).or_insert_with(AssetInfo::native);
    map
}

impl AssetResolver for TokenListResolver {
    async fn resolve(&self, asset_id: AssetId) -> AssetInfo {
        if asset_id == B256::ZERO {
            return AssetInfo::native();
        }
        self.tokens()
            .await
            .and_then(|tokens| tokens.get(&asset_id).cloned())
            .unwrap_or_else(AssetInfo::native)
    }
}
