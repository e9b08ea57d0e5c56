//! # Payment Assets
//!
//! Display metadata for the asset a game is paid in, and integer-only
//! amount formatting.

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

/// Native asset decimals.
pub const NATIVE_DECIMALS: u8 = 18;

/// Native asset logo.
pub const NATIVE_ICON_URL: &str =
    "https://raw.githubusercontent.com/alephium/token-list/master/logos/ALPH.png";

/// Display metadata for a payment asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Asset id; all zeroes for the native asset.
    pub id: AssetId,
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places of the smallest unit.
    pub decimals: u8,
    /// Logo URL, if the token list has one.
    #[serde(rename = "logoURI", default)]
    pub icon_url: Option<String>,
}

impl AssetInfo {
    /// The chain's native asset.
    #[must_use]
    pub fn native() -> Self {
        Self {
            id: B256::ZERO,
            name: "Alephium".to_string(),
            symbol: "ALPH".to_string(),
            decimals: NATIVE_DECIMALS,
            icon_url: Some(NATIVE_ICON_URL.to_string()),
        }
    }

    /// Whether this is the native asset.
    #[inline]
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.id == B256::ZERO
    }

    /// Formats a smallest-unit amount, e.g. `1500000000000000000` → `1.5`.
    #[must_use]
    pub fn format_amount(&self, amount: U256) -> String {
        format_amount(amount, self.decimals)
    }

    /// Formats an amount followed by the symbol.
    #[must_use]
    pub fn display_amount(&self, amount: U256) -> String {
        format!("{} {}", self.format_amount(amount), self.symbol)
    }
}

/// Formats a smallest-unit amount with `decimals` places, trimming trailing
/// zeros from the fraction.
#[must_use]
pub fn format_amount(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()))
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::from(1_500_000_000_000_000_000u64), 18), "1.5");
        assert_eq!(format_amount(U256::from(2_000_000_000_000_000_000u64), 18), "2");
        assert_eq!(format_amount(U256::from(5u64), 18), "0.000000000000000005");
        assert_eq!(format_amount(U256::ZERO, 18), "0");
        assert_eq!(format_amount(U256::from(1234u64), 0), "1234");
        assert_eq!(format_amount(U256::from(1230u64), 2), "12.3");
    }

    #[test]
    fn test_native() {
        let alph = AssetInfo::native();
        assert!(alph.is_native());
        assert_eq!(alph.display_amount(U256::from(100_000_000_000_000_000u64)), "0.1 ALPH");
    }
}
