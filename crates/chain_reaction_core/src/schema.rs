//! # Canonical Schema
//!
//! Typed decode of the current contract version's state.
//!
//! ## Layout
//!
//! ```text
//! immutable: factoryId, durationDecreaseMs, minDuration
//! mutable:   chainId, currentEntry, lastPlayer, lastEntryTimestamp, pot,
//!            boostAmount, isActive, playerCount, endTimestamp, baseEntry,
//!            multiplierBps, durationMs, tokenId, burnBps, burnedAmount
//! ```
//!
//! Every field's wire type must match its declaration. A legacy contract
//! (two immutable fields) fails here and is handed to [`crate::legacy`].

use alloy_primitives::{B256, U256};

use crate::error::{SyncError, SyncResult};
use crate::ids::{Address, Bps};
use crate::state::ContractFields;
use crate::value::{FieldValue, RawState};

/// Immutable field count of the canonical layout.
pub const CANONICAL_IMMUTABLE_FIELDS: usize = 3;

/// Mutable field count of the canonical layout.
pub const CANONICAL_MUTABLE_FIELDS: usize = 15;

/// How strictly a reader interprets wire types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Coercion {
    /// Declared wire type must match.
    Strict,
    /// Any payload that converts cleanly is accepted.
    Lenient,
}

/// Positional reader over one section of a raw state.
pub(crate) struct FieldReader<'a> {
    section: &'static str,
    fields: &'a [FieldValue],
    coercion: Coercion,
}

impl<'a> FieldReader<'a> {
    /// Checks the field count before any field is read.
    pub(crate) fn new(
        section: &'static str,
        fields: &'a [FieldValue],
        expected: usize,
        coercion: Coercion,
    ) -> SyncResult<Self> {
        if fields.len() != expected {
            return Err(SyncError::schema(
                section,
                format!("expected {expected} fields, found {}", fields.len()),
            ));
        }
        Ok(Self {
            section,
            fields,
            coercion,
        })
    }

    fn mismatch(&self, index: usize, name: &str, wanted: &str) -> SyncError {
        SyncError::schema(
            self.section,
            format!(
                "field {index} ({name}): expected {wanted}, found {}",
                self.fields[index].type_name()
            ),
        )
    }

    pub(crate) fn u256(&self, index: usize, name: &str) -> SyncResult<U256> {
        let field = &self.fields[index];
        match self.coercion {
            Coercion::Strict => field.as_u256(),
            Coercion::Lenient => field.coerce_u256(),
        }
        .ok_or_else(|| self.mismatch(index, name, "U256"))
    }

    pub(crate) fn u64(&self, index: usize, name: &str) -> SyncResult<u64> {
        let value = self.u256(index, name)?;
        u64::try_from(value).map_err(|_| {
            SyncError::schema(self.section, format!("field {index} ({name}): {value} exceeds u64"))
        })
    }

    pub(crate) fn bps(&self, index: usize, name: &str) -> SyncResult<Bps> {
        let value = self.u256(index, name)?;
        u16::try_from(value)
            .ok()
            .and_then(Bps::new)
            .ok_or_else(|| {
                SyncError::schema(
                    self.section,
                    format!("field {index} ({name}): {value} is not a basis point value"),
                )
            })
    }

    pub(crate) fn bool(&self, index: usize, name: &str) -> SyncResult<bool> {
        let field = &self.fields[index];
        match self.coercion {
            Coercion::Strict => field.as_bool(),
            Coercion::Lenient => field.coerce_bool(),
        }
        .ok_or_else(|| self.mismatch(index, name, "Bool"))
    }

    pub(crate) fn address(&self, index: usize, name: &str) -> SyncResult<Address> {
        let field = &self.fields[index];
        match self.coercion {
            Coercion::Strict => field.as_address(),
            Coercion::Lenient => field.coerce_address(),
        }
        .ok_or_else(|| self.mismatch(index, name, "Address"))
    }

    pub(crate) fn bytes32(&self, index: usize, name: &str) -> SyncResult<B256> {
        let field = &self.fields[index];
        match self.coercion {
            Coercion::Strict => field.as_bytes32(),
            Coercion::Lenient => field.coerce_bytes32(),
        }
        .ok_or_else(|| self.mismatch(index, name, "ByteVec(32)"))
    }
}

/// Decodes a raw state with the canonical layout.
///
/// # Errors
///
/// Returns `SchemaMismatch` on any field-count or field-type violation.
pub fn decode_canonical(raw: &RawState) -> SyncResult<ContractFields> {
    let imm = FieldReader::new(
        "canonical immutable fields",
        &raw.immutable,
        CANONICAL_IMMUTABLE_FIELDS,
        Coercion::Strict,
    )?;
    let mutable = FieldReader::new(
        "canonical mutable fields",
        &raw.mutable,
        CANONICAL_MUTABLE_FIELDS,
        Coercion::Strict,
    )?;

    // The factory id is part of the layout but not of the canonical record.
    imm.bytes32(0, "factoryId")?;

    Ok(ContractFields {
        chain_id: mutable.u256(0, "chainId")?,
        current_entry: mutable.u256(1, "currentEntry")?,
        last_player: mutable.address(2, "lastPlayer")?,
        last_entry_timestamp: mutable.u64(3, "lastEntryTimestamp")?,
        pot: mutable.u256(4, "pot")?,
        boost_amount: mutable.u256(5, "boostAmount")?,
        is_active: mutable.bool(6, "isActive")?,
        player_count: mutable.u64(7, "playerCount")?,
        end_timestamp: mutable.u64(8, "endTimestamp")?,
        base_entry: mutable.u256(9, "baseEntry")?,
        multiplier: mutable.bps(10, "multiplierBps")?,
        duration_ms: mutable.u64(11, "durationMs")?,
        asset_id: mutable.bytes32(12, "tokenId")?,
        burn_rate: mutable.bps(13, "burnBps")?,
        burned_amount: mutable.u256(14, "burnedAmount")?,
        duration_decrease_ms: imm.u64(1, "durationDecreaseMs")?,
        min_duration_ms: imm.u64(2, "minDuration")?,
    })
}

/// Encodes fields with the canonical layout.
#[must_use]
pub fn encode_canonical(fields: &ContractFields, factory_id: B256) -> RawState {
    RawState {
        immutable: vec![
            FieldValue::bytes32(factory_id),
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
            FieldValue::Bool(fields.is_active),
            FieldValue::u256(U256::from(fields.player_count)),
            FieldValue::u256(U256::from(fields.end_timestamp)),
            FieldValue::u256(fields.base_entry),
            FieldValue::u256(U256::from(fields.multiplier.get())),
            FieldValue::u256(U256::from(fields.duration_ms)),
            FieldValue::bytes32(fields.asset_id),
            FieldValue::u256(U256::from(fields.burn_rate.get())),
            FieldValue::u256(fields.burned_amount),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::active_fields;

    #[test]
    fn test_canonical_decode() {
        let fields = active_fields();
        let raw = encode_canonical(&fields, B256::repeat_byte(9));
        assert_eq!(decode_canonical(&raw).unwrap(), fields);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut raw = encode_canonical(&active_fields(), B256::ZERO);
        // isActive travelling as an integer is fine for the legacy decoder,
        // not for the typed one.
        raw.mutable[6] = FieldValue::U256("1".into());
        let err = decode_canonical(&raw).unwrap_err();
        assert!(matches!(err, SyncError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("isActive"));
    }

    #[test]
    fn test_legacy_shape_rejected() {
        let mut raw = encode_canonical(&active_fields(), B256::ZERO);
        raw.immutable.remove(0);
        let err = decode_canonical(&raw).unwrap_err();
        assert!(err.to_string().contains("expected 3 fields, found 2"));
    }

    #[test]
    fn test_bps_out_of_range_rejected() {
        let mut raw = encode_canonical(&active_fields(), B256::ZERO);
        raw.mutable[10] = FieldValue::u256(U256::from(10_001u64));
        assert!(decode_canonical(&raw).is_err());
    }
}
