//! # Legacy State Decoder
//!
//! Positional decode of the first contract version, which has no typed ABI
//! on the client side. Used only after the canonical decode has failed.
//!
//! ## Layout (version-pinned)
//!
//! ```text
//! mutable[0..15]:  chainId, currentEntry, lastPlayer, lastEntryTimestamp,
//!                  pot, boostAmount, playerCount, isActive, baseEntry,
//!                  endTimestamp, durationMs, multiplierBps, tokenId,
//!                  burnBps, burnedAmount
//! immutable[0..2]: durationDecreaseMs, minDuration
//! ```
//!
//! This version exposes no `getNextEntryPrice`/`canEnd` views, so both are
//! derived locally from the decoded fields and the caller's clock.

use alloy_primitives::U256;

use crate::error::SyncResult;
use crate::schema::{Coercion, FieldReader};
use crate::state::{ContractFields, GameState, StateSource};
use crate::value::{FieldValue, RawState};

/// Mutable field count of the legacy layout.
pub const LEGACY_MUTABLE_FIELDS: usize = 15;

/// Immutable field count of the legacy layout.
pub const LEGACY_IMMUTABLE_FIELDS: usize = 2;

/// Decodes the stored fields of a legacy contract.
///
/// # Errors
///
/// Returns `SchemaMismatch` if either section has the wrong field count or a
/// field cannot be coerced.
pub fn decode_legacy_fields(raw: &RawState) -> SyncResult<ContractFields> {
    let mutable = FieldReader::new(
        "legacy mutable fields",
        &raw.mutable,
        LEGACY_MUTABLE_FIELDS,
        Coercion::Lenient,
    )?;
    let imm = FieldReader::new(
        "legacy immutable fields",
        &raw.immutable,
        LEGACY_IMMUTABLE_FIELDS,
        Coercion::Lenient,
    )?;

    Ok(ContractFields {
        chain_id: mutable.u256(0, "chainId")?,
        current_entry: mutable.u256(1, "currentEntry")?,
        last_player: mutable.address(2, "lastPlayer")?,
        last_entry_timestamp: mutable.u64(3, "lastEntryTimestamp")?,
        pot: mutable.u256(4, "pot")?,
        boost_amount: mutable.u256(5, "boostAmount")?,
        player_count: mutable.u64(6, "playerCount")?,
        is_active: mutable.bool(7, "isActive")?,
        base_entry: mutable.u256(8, "baseEntry")?,
        end_timestamp: mutable.u64(9, "endTimestamp")?,
        duration_ms: mutable.u64(10, "durationMs")?,
        multiplier: mutable.bps(11, "multiplierBps")?,
        asset_id: mutable.bytes32(12, "tokenId")?,
        burn_rate: mutable.bps(13, "burnBps")?,
        burned_amount: mutable.u256(14, "burnedAmount")?,
        duration_decrease_ms: imm.u64(0, "durationDecreaseMs")?,
        min_duration_ms: imm.u64(1, "minDuration")?,
    })
}

/// Decodes a legacy contract into a canonical `GameState`.
///
/// # Errors
///
/// See [`decode_legacy_fields`].
pub fn decode_legacy(raw: &RawState, now_ms: u64) -> SyncResult<GameState> {
    let fields = decode_legacy_fields(raw)?;
    Ok(GameState::derive_locally(fields, now_ms, StateSource::Legacy))
}

/// Encodes fields with the legacy layout.
#[must_use]
pub fn encode_legacy(fields: &ContractFields) -> RawState {
    RawState {
        immutable: vec![
            FieldValue::u256(U256::from(fields.duration_decrease_ms)),
            FieldValue::u256(U256::from(fields.min_duration_ms)),
        ],
        mutable: vec![
            FieldValue::u256(fields.chain_id),
            FieldValue::u256(fields.current_entry),
            FieldValue::address(&fields.last_player),
            FieldValue::u256(U256::from(fields.last_entry_timestamp)),
            FieldValue::u256(fields.pot),
            FieldValue::u256(fields.boost_amount),
            FieldValue::u256(U256::from(fields.player_count)),
            FieldValue::Bool(fields.is_active),
            FieldValue::u256(fields.base_entry),
            FieldValue::u256(U256::from(fields.end_timestamp)),
            FieldValue::u256(U256::from(fields.duration_ms)),
            FieldValue::u256(U256::from(fields.multiplier.get())),
            FieldValue::bytes32(fields.asset_id),
            FieldValue::u256(U256::from(fields.burn_rate.get())),
            FieldValue::u256(fields.burned_amount),
        ],
    }
}
