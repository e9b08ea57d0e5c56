//! # Node Client
//!
//! [`StateQuery`] and [`EventLog`] over the node's REST API.
//!
//! | Call                  | Endpoint                                       |
//! |-----------------------|------------------------------------------------|
//! | `raw_state`           | `GET  /contracts/{address}/state`              |
//! | `next_entry_price`    | `POST /contracts/call-contract`                |
//! | `can_end`             | `POST /contracts/call-contract`                |
//! | `current_event_count` | `GET  /events/contract/{address}/current-count`|
//! | `fetch_events`        | `GET  /events/contract/{address}?start=&limit=`|
//!
//! Transport and HTTP status failures map to `TransientFetch`; payloads
//! that arrive but do not fit map to `SchemaMismatch`.

pub(crate) mod wire;

use chain_reaction_core::schema::decode_canonical;
use chain_reaction_core::{Address, ContractFields, FieldValue, RawState, SyncError, SyncResult, U256};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::config::{AbiConfig, SyncConfig};
use crate::remote::{EventLog, EventPage, StateQuery};

use self::wire::{CallContractRequest, CallContractResult, ContractEventsResponse, ContractStateResponse};

pub(crate) fn transient(e: &reqwest::Error) -> SyncError {
    SyncError::TransientFetch(e.to_string())
}

/// HTTP client for one node.
#[derive(Clone, Debug)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
    group: u32,
    page_limit: u32,
    abi: AbiConfig,
    factory_address: Address,
}

impl NodeClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.polling.request_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.node_url().to_string(),
            group: config.group,
            page_limit: config.polling.page_limit,
            abi: config.abi.clone(),
            factory_address: config.factory_address.clone(),
        })
    }

    /// Node base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, u64)]) -> SyncResult<T> {
        let url = format!("{}{path}", self.base_url);
        trace!(url = %url, "GET");
        self.http
            .get(&url)
            .query(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| transient(&e))?
            .json::<T>()
            .await
            .map_err(|e| transient(&e))
    }

    async fn call_view(&self, address: &Address, method_index: u32) -> SyncResult<FieldValue> {
        let url = format!("{}/contracts/call-contract", self.base_url);
        let request = CallContractRequest {
            group: self.group,
            address: address.as_str(),
            method_index,
        };
        let result: CallContractResult = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| transient(&e))?
            .json()
            .await
            .map_err(|e| transient(&e))?;

        match result {
            CallContractResult::CallContractSucceeded { returns } => returns
                .into_iter()
                .next()
                .ok_or_else(|| SyncError::schema("view returns", format!("method {method_index} returned nothing"))),
            CallContractResult::CallContractFailed { error } => Err(SyncError::TransientFetch(format!(
                "method {method_index} on {address}: {error}"
            ))),
        }
    }

    fn event_names(&self, address: &Address) -> &[String] {
        if *address == self.factory_address {
            &self.abi.factory_events
        } else {
            &self.abi.game_events
        }
    }
}

impl StateQuery for NodeClient {
    async fn contract_fields(&self, address: &Address) -> SyncResult<ContractFields> {
        let raw = self.raw_state(address).await?;
        decode_canonical(&raw)
    }

    async fn raw_state(&self, address: &Address) -> SyncResult<RawState> {
        let response: ContractStateResponse = self
            .get_json(&format!("/contracts/{address}/state"), &[])
            .await?;
        Ok(response.into())
    }

    async fn next_entry_price(&self, address: &Address) -> SyncResult<U256> {
        let value = self.call_view(address, self.abi.next_entry_price_method).await?;
        value.as_u256().ok_or_else(|| {
            SyncError::schema("getNextEntryPrice", format!("expected U256, found {}", value.type_name()))
        })
    }

    async fn can_end(&self, address: &Address) -> SyncResult<bool> {
        let value = self.call_view(address, self.abi.can_end_method).await?;
        value
            .as_bool()
            .ok_or_else(|| SyncError::schema("canEnd", format!("expected Bool, found {}", value.type_name())))
    }
}

impl EventLog for NodeClient {
    async fn current_event_count(&self, address: &Address) -> SyncResult<u64> {
        self.get_json(&format!("/events/contract/{address}/current-count"), &[])
            .await
    }

    async fn fetch_events(&self, address: &Address, start: u64) -> SyncResult<EventPage> {
        let response: ContractEventsResponse = self
            .get_json(
                &format!("/events/contract/{address}"),
                &[("start", start), ("limit", u64::from(self.page_limit))],
            )
            .await?;

        let names = self.event_names(address);
        let events = response
            .events
            .into_iter()
            .map(|event| event.into_raw(names))
            .collect::<SyncResult<Vec<_>>>()?;
        Ok(EventPage {
            events,
            next_start: response.next_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;

    #[test]
    fn test_client_from_config() {
        let mut config = SyncConfig::new(Network::Testnet, Address::new("2AFactory"));
        config.node_url = Some("http://127.0.0.1:12973/".to_string());
        let client = NodeClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:12973");
    }

    #[test]
    fn test_event_tables() {
        let config = SyncConfig::new(Network::Devnet, Address::new("2AFactory"));
        let client = NodeClient::new(&config).unwrap();
        assert_eq!(client.event_names(&Address::new("2AFactory:0"))[0], "NewGameCreated");
        assert_eq!(client.event_names(&Address::new("2AGame"))[0], "ChainStarted");
    }
}
