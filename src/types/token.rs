//! Token identities and unit conversion helpers.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::ethereum::constants::NATIVE_TOKEN_ADDRESS;

/// A token registered for a chain.
///
/// Identity is the `(chain_id, address)` pair. Addresses are compared as raw
/// bytes, so differently-cased hex spellings of the same address are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Chain the token lives on.
    pub chain_id: u64,
    /// Contract address ([`NATIVE_TOKEN_ADDRESS`] for the native asset).
    pub address: Address,
    /// Number of decimals.
    pub decimals: u8,
    /// Token symbol (e.g., "USDC").
    pub symbol: String,
    /// Token name (e.g., "USD Coin").
    pub name: String,
    /// Logo URI.
    #[serde(rename = "logoURI", default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    /// Token list tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Token {
    /// Create a token without logo or tags.
    pub fn new(
        chain_id: u64,
        address: Address,
        decimals: u8,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol: symbol.into(),
            name: name.into(),
            logo_uri: None,
            tags: Vec::new(),
        }
    }

    /// Whether both tokens denote the same asset on the same chain.
    pub fn same_as(&self, other: &Token) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }

    /// Whether this token is the chain's native asset.
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN_ADDRESS
    }
}

/// Format a U256 value with decimals to a human-readable string.
pub fn format_units(value: U256, decimals: u8) -> String {
    // Handle zero case explicitly
    if value == U256::ZERO {
        return "0".to_string();
    }

    let value_str = value.to_string();
    let decimals = decimals as usize;

    if decimals == 0 {
        return value_str;
    }

    let len = value_str.len();
    if len <= decimals {
        // Value is less than 1, pad with zeros
        let zeros = decimals - len;
        let decimal_part = value_str.trim_end_matches('0');
        if decimal_part.is_empty() {
            "0".to_string()
        } else {
            format!("0.{}{}", "0".repeat(zeros), decimal_part)
        }
    } else {
        // Split into integer and decimal parts
        let (integer, decimal) = value_str.split_at(len - decimals);
        let decimal = decimal.trim_end_matches('0');
        if decimal.is_empty() {
            integer.to_string()
        } else {
            format!("{}.{}", integer, decimal)
        }
    }
}

/// `10^decimals` as a U256.
fn scale(decimals: usize) -> U256 {
    U256::from(10).pow(U256::from(decimals))
}

/// Parse a human-readable amount string to U256 with decimals.
///
/// Excess fractional digits are truncated; results that do not fit in 256
/// bits are rejected.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, String> {
    let amount = amount.trim();

    // Check for empty input
    if amount.is_empty() {
        return Err("Amount cannot be empty".to_string());
    }

    // Check for negative numbers
    if amount.starts_with('-') {
        return Err("Amount cannot be negative".to_string());
    }

    let decimals = decimals as usize;
    let parts: Vec<&str> = amount.split('.').collect();

    match parts.len() {
        1 => {
            // No decimal point
            let value = parts[0].parse::<U256>().map_err(|e| format!("Invalid amount: {}", e))?;
            value.checked_mul(scale(decimals)).ok_or_else(|| "Amount too large".to_string())
        }
        2 => {
            let integer = parts[0];
            let mut fraction = parts[1].to_string();

            // Pad or truncate fraction to match decimals
            if fraction.len() > decimals {
                fraction.truncate(decimals);
            } else {
                fraction.push_str(&"0".repeat(decimals - fraction.len()));
            }

            let integer_value = if integer.is_empty() {
                U256::ZERO
            } else {
                integer.parse::<U256>().map_err(|e| format!("Invalid integer part: {}", e))?
            };

            let fraction_value = if fraction.is_empty() {
                U256::ZERO
            } else {
                fraction.parse::<U256>().map_err(|e| format!("Invalid fraction part: {}", e))?
            };

            integer_value
                .checked_mul(scale(decimals))
                .and_then(|v| v.checked_add(fraction_value))
                .ok_or_else(|| "Amount too large".to_string())
        }
        _ => Err("Invalid amount format".to_string()),
    }
}
