//! Node REST payloads.

use std::str::FromStr;

use chain_reaction_core::{FieldValue, RawEvent, RawState, SyncError, SyncResult, B256};
use serde::{Deserialize, Serialize};

/// `GET /contracts/{address}/state`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContractStateResponse {
    pub imm_fields: Vec<FieldValue>,
    pub mut_fields: Vec<FieldValue>,
}

impl From<ContractStateResponse> for RawState {
    fn from(response: ContractStateResponse) -> Self {
        Self {
            immutable: response.imm_fields,
            mutable: response.mut_fields,
        }
    }
}

/// `GET /events/contract/{address}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContractEventsResponse {
    pub events: Vec<ContractEventDto>,
    pub next_start: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContractEventDto {
    pub tx_id: String,
    pub event_index: i32,
    pub fields: Vec<FieldValue>,
}

impl ContractEventDto {
    /// Names the event from the contract's declaration table.
    pub(crate) fn into_raw(self, names: &[String]) -> SyncResult<RawEvent> {
        let tx_id = B256::from_str(&self.tx_id)
            .map_err(|e| SyncError::schema("event txId", format!("{}: {e}", self.tx_id)))?;
        let name = usize::try_from(self.event_index)
            .ok()
            .and_then(|i| names.get(i))
            .cloned()
            .unwrap_or_else(|| format!("Event{}", self.event_index));
        Ok(RawEvent {
            tx_id,
            event_index: self.event_index,
            name,
            fields: self.fields,
        })
    }
}

/// `POST /contracts/call-contract`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CallContractRequest<'a> {
    pub group: u32,
    pub address: &'a str,
    pub method_index: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum CallContractResult {
    CallContractSucceeded { returns: Vec<FieldValue> },
    CallContractFailed { error: String },
}

/// A published token list.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenListResponse {
    pub tokens: Vec<TokenDto>,
}

/// One entry of a token list.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenDto {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_payload() {
        let json = r#"{
            "events": [{
                "blockHash": "00aa",
                "txId": "0000000000000000000000000000000000000000000000000000000000000007",
                "eventIndex": 1,
                "fields": [
                    {"type": "U256", "value": "3"},
                    {"type": "Address", "value": "1Alice"},
                    {"type": "U256", "value": "2"},
                    {"type": "U256", "value": "105"},
                    {"type": "U256", "value": "1"}
                ]
            }],
            "nextStart": 12
        }"#;
        let response: ContractEventsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.next_start, 12);

        let names = vec!["ChainStarted".to_string(), "PlayerJoined".to_string()];
        let raw = response.events.into_iter().next().unwrap().into_raw(&names).unwrap();
        assert_eq!(raw.name, "PlayerJoined");
        assert_eq!(raw.tx_id, B256::with_last_byte(7));
        assert_eq!(raw.fields.len(), 5);
    }

    #[test]
    fn test_unknown_event_index() {
        let dto = ContractEventDto {
            tx_id: "00".repeat(32),
            event_index: 9,
            fields: vec![],
        };
        assert_eq!(dto.into_raw(&[]).unwrap().name, "Event9");
    }

    #[test]
    fn test_bad_tx_id() {
        let dto = ContractEventDto {
            tx_id: "zz".to_string(),
            event_index: 0,
            fields: vec![],
        };
        assert!(matches!(dto.into_raw(&[]), Err(SyncError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_call_results() {
        let ok: CallContractResult = serde_json::from_str(
            r#"{"type": "CallContractSucceeded", "returns": [{"type": "Bool", "value": true}], "gasUsed": 1}"#,
        )
        .unwrap();
        assert!(matches!(ok, CallContractResult::CallContractSucceeded { ref returns } if returns.len() == 1));

        let failed: CallContractResult =
            serde_json::from_str(r#"{"type": "CallContractFailed", "error": "VM error"}"#).unwrap();
        assert!(matches!(failed, CallContractResult::CallContractFailed { .. }));
    }

    #[test]
    fn test_state_payload() {
        let json = r#"{
            "address": "2A",
            "immFields": [{"type": "U256", "value": "60000"}],
            "mutFields": [{"type": "Bool", "value": false}],
            "asset": {"attoAlphAmount": "1"}
        }"#;
        let raw: RawState = serde_json::from_str::<ContractStateResponse>(json).unwrap().into();
        assert_eq!(raw.immutable.len(), 1);
        assert_eq!(raw.mutable, vec![FieldValue::Bool(false)]);
    }
}
