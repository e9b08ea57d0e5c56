//! # Identifiers
//!
//! Addresses, contract ids, asset ids and basis points.
//!
//! Addresses arrive from the node in several spellings (with or without a
//! `:group` suffix). They are normalized once at the boundary so that map
//! keys in the ledger and leaderboard never split one participant in two.

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Prefix byte the node uses when encoding a contract id as an address.
const CONTRACT_ADDRESS_PREFIX: u8 = 0x03;

/// Transaction identifier.
pub type TxId = B256;

/// Payment asset identifier. All zeroes is the native asset.
pub type AssetId = B256;

/// A normalized participant or contract address.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Creates an address, stripping any `:group` suffix.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref();
        let clean = raw.split_once(':').map_or(raw, |(head, _)| head);
        Self(clean.to_string())
    }

    /// Returns the normalized address string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a display form like `1DrDyT...4Kzq` for long addresses.
    #[must_use]
    pub fn shortened(&self) -> String {
        let len = self.0.chars().count();
        if len <= 12 {
            return self.0.clone();
        }
        let head: String = self.0.chars().take(6).collect();
        let tail: String = self.0.chars().skip(len - 4).collect();
        format!("{head}...{tail}")
    }

    /// Decodes this address as a contract address, returning its contract id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the address is not base58 or does not
    /// carry the contract prefix and a 32-byte id.
    pub fn contract_id(&self) -> SyncResult<ContractId> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| SyncError::InvalidArgument(format!("address {}: {e}", self.0)))?;
        match bytes.split_first() {
            Some((&CONTRACT_ADDRESS_PREFIX, id)) if id.len() == 32 => {
                Ok(ContractId(B256::from_slice(id)))
            }
            _ => Err(SyncError::InvalidArgument(format!(
                "address {} is not a contract address",
                self.0
            ))),
        }
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-byte contract identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub B256);

impl ContractId {
    /// Derives the contract's address (base58 of `0x03 || id`).
    #[must_use]
    pub fn to_address(&self) -> Address {
        let mut bytes = Vec::with_capacity(33);
        bytes.push(CONTRACT_ADDRESS_PREFIX);
        bytes.extend_from_slice(self.0.as_slice());
        Address(bs58::encode(bytes).into_string())
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Basis points: integer units of 1/10000.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Bps(u16);

impl Bps {
    /// One whole (100%).
    pub const MAX: Self = Self(10_000);

    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates a basis point value, `None` when above 10000.
    #[inline]
    #[must_use]
    pub const fn new(value: u16) -> Option<Self> {
        if value <= 10_000 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Bps {
    type Error = SyncError;

    fn try_from(value: u16) -> SyncResult<Self> {
        Self::new(value)
            .ok_or_else(|| SyncError::InvalidArgument(format!("{value} bps exceeds 10000")))
    }
}

impl From<Bps> for u16 {
    fn from(bps: Bps) -> Self {
        bps.0
    }
}
