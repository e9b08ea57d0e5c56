//! # Raw Field Values
//!
//! Schema-less field values as returned by the node, and the explicit
//! coercions the decoders apply to them.
//!
//! On the wire a value looks like `{"type": "U256", "value": "1000"}`.
//! Integers always travel as decimal strings.

use std::str::FromStr;

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::ids::Address;

/// A single raw field value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FieldValue {
    /// Boolean.
    Bool(bool),
    /// Signed 256-bit integer as a decimal string.
    I256(String),
    /// Unsigned 256-bit integer as a decimal string.
    U256(String),
    /// Hex-encoded byte vector.
    ByteVec(String),
    /// Base58 address.
    Address(String),
}

impl FieldValue {
    /// Wire type name, used in mismatch reports.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::I256(_) => "I256",
            Self::U256(_) => "U256",
            Self::ByteVec(_) => "ByteVec",
            Self::Address(_) => "Address",
        }
    }

    /// Builds a `U256` field from an integer.
    #[must_use]
    pub fn u256(value: U256) -> Self {
        Self::U256(value.to_string())
    }

    /// Builds an `Address` field.
    #[must_use]
    pub fn address(value: &Address) -> Self {
        Self::Address(value.as_str().to_string())
    }

    /// Builds a `ByteVec` field from 32 bytes.
    #[must_use]
    pub fn bytes32(value: B256) -> Self {
        Self::ByteVec(format!("{value:x}").trim_start_matches("0x").to_string())
    }

    /// Strictly typed: only a `U256` field.
    #[must_use]
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Self::U256(s) => parse_decimal(s),
            _ => None,
        }
    }

    /// Strictly typed: only a `Bool` field.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Strictly typed: only an `Address` field.
    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(s) => Some(Address::new(s)),
            _ => None,
        }
    }

    /// Strictly typed: only a 32-byte `ByteVec` field.
    #[must_use]
    pub fn as_bytes32(&self) -> Option<B256> {
        match self {
            Self::ByteVec(s) => parse_bytes32(s),
            _ => None,
        }
    }

    /// Lenient: any integer-string carried by the field.
    ///
    /// Accepts `U256` and non-negative `I256` payloads.
    #[must_use]
    pub fn coerce_u256(&self) -> Option<U256> {
        match self {
            Self::U256(s) | Self::I256(s) => parse_decimal(s),
            _ => None,
        }
    }

    /// Lenient integer coercion narrowed to `u64`.
    #[must_use]
    pub fn coerce_u64(&self) -> Option<u64> {
        self.coerce_u256().and_then(|v| u64::try_from(v).ok())
    }

    /// Lenient boolean coercion (`Bool`, or the strings `true`/`false`).
    #[must_use]
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::U256(s) | Self::I256(s) | Self::ByteVec(s) | Self::Address(s) => {
                bool::from_str(s).ok()
            }
        }
    }

    /// Lenient address coercion: any string payload.
    #[must_use]
    pub fn coerce_address(&self) -> Option<Address> {
        match self {
            Self::Address(s) | Self::ByteVec(s) => Some(Address::new(s)),
            _ => None,
        }
    }

    /// Lenient asset id coercion. An empty byte vector is the native asset.
    #[must_use]
    pub fn coerce_bytes32(&self) -> Option<B256> {
        match self {
            Self::ByteVec(s) if s.is_empty() => Some(B256::ZERO),
            Self::ByteVec(s) => parse_bytes32(s),
            _ => None,
        }
    }
}

/// Raw contract state: immutable and mutable field lists, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawState {
    /// Immutable fields (`immFields` on the wire).
    #[serde(rename = "immFields")]
    pub immutable: Vec<FieldValue>,
    /// Mutable fields (`mutFields` on the wire).
    #[serde(rename = "mutFields")]
    pub mutable: Vec<FieldValue>,
}

fn parse_decimal(s: &str) -> Option<U256> {
    if s.is_empty() || s.starts_with('-') {
        return None;
    }
    U256::from_str_radix(s, 10).ok()
}

fn parse_bytes32(s: &str) -> Option<B256> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() != 64 {
        return None;
    }
    B256::from_str(s).ok()
}
