//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

pub mod chains;

use std::env;
use std::str::FromStr;

use alloy::primitives::Address;
use rust_decimal::Decimal;

use crate::{
    error::AppError,
    ethereum::constants::DEFAULT_CHAIN_ID,
    types::{slippage_percent_to_bps, Exchange},
};

pub use chains::{ChainConfig, ChainRegistry, SettlementContracts};

/// Uniswap default token list URL.
pub const DEFAULT_TOKEN_LIST_URL: &str = "https://tokens.uniswap.org";

/// Default slippage tolerance in basis points (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Default transaction deadline in minutes.
pub const DEFAULT_DEADLINE_MINUTES: u64 = 20;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ethereum JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Private key for wallet (hex string with 0x prefix).
    pub private_key: String,
    /// Logging level (default: info).
    pub log_level: String,
    /// Chain the server routes on (default: Polygon).
    pub chain_id: u64,
    /// Slippage tolerance in basis points.
    pub slippage_bps: u32,
    /// Deadline window for user operations, in minutes.
    pub deadline_minutes: u64,
    /// Token list fetched by the token directory.
    pub token_list_url: String,
    /// Exchange used for routing.
    pub exchange: Exchange,
    /// Atlas contracts, when all three addresses are configured.
    pub settlement: Option<SettlementContracts>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `ETHEREUM_RPC_URL`: JSON-RPC endpoint of the routed chain
    /// - `ETHEREUM_PRIVATE_KEY`: Private key for wallet (hex)
    ///
    /// Optional environment variables:
    /// - `LOG_LEVEL`: Logging level (default: info)
    /// - `CHAIN_ID`: Chain to route on (default: 137)
    /// - `SLIPPAGE_TOLERANCE`: Percent, 0 to 50 (default: 0.5)
    /// - `TRANSACTION_DEADLINE_MINUTES`: Deadline window (default: 20)
    /// - `TOKEN_LIST_URL`: Token list URL (default: Uniswap default list)
    /// - `EXCHANGE`: `uniswap_v2` or `uniswap_v3` (default: uniswap_v2)
    /// - `ATLAS_ADDRESS`, `ATLAS_VERIFICATION_ADDRESS`, `DAPP_CONTROL_ADDRESS`:
    ///   Atlas contracts, required together to build user operations
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let rpc_url = env::var("ETHEREUM_RPC_URL").map_err(|_| {
            AppError::Config("ETHEREUM_RPC_URL environment variable not set".into())
        })?;

        let private_key = env::var("ETHEREUM_PRIVATE_KEY").map_err(|_| {
            AppError::Config("ETHEREUM_PRIVATE_KEY environment variable not set".into())
        })?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let chain_id = optional_var("CHAIN_ID")
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| AppError::Config(format!("Invalid CHAIN_ID '{}': {}", v, e)))
            })
            .transpose()?
            .unwrap_or(DEFAULT_CHAIN_ID);

        let slippage_bps =
            optional_var("SLIPPAGE_TOLERANCE").map(|v| parse_slippage(&v)).transpose()?;

        let deadline_minutes = optional_var("TRANSACTION_DEADLINE_MINUTES")
            .map(|v| {
                v.parse::<u64>().map_err(|e| {
                    AppError::Config(format!("Invalid TRANSACTION_DEADLINE_MINUTES '{}': {}", v, e))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_DEADLINE_MINUTES);

        let token_list_url =
            optional_var("TOKEN_LIST_URL").unwrap_or_else(|| DEFAULT_TOKEN_LIST_URL.to_string());

        let exchange = optional_var("EXCHANGE")
            .map(|v| Exchange::from_str(&v).map_err(AppError::Config))
            .transpose()?
            .unwrap_or(Exchange::UniswapV2);

        let settlement = parse_settlement(
            optional_var("ATLAS_ADDRESS"),
            optional_var("ATLAS_VERIFICATION_ADDRESS"),
            optional_var("DAPP_CONTROL_ADDRESS"),
        )?;

        Ok(Self {
            rpc_url,
            private_key,
            log_level,
            chain_id,
            slippage_bps: slippage_bps.unwrap_or(DEFAULT_SLIPPAGE_BPS),
            deadline_minutes,
            token_list_url,
            exchange,
            settlement,
        })
    }

    /// Configuration with defaults for everything but the endpoint and key.
    pub fn new(rpc_url: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            private_key: private_key.into(),
            log_level: "info".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            deadline_minutes: DEFAULT_DEADLINE_MINUTES,
            token_list_url: DEFAULT_TOKEN_LIST_URL.to_string(),
            exchange: Exchange::UniswapV2,
            settlement: None,
        }
    }

    /// Built-in chains with the configured settlement contracts attached.
    pub fn chain_registry(&self) -> Result<ChainRegistry, AppError> {
        let registry = ChainRegistry::builtin();
        registry.get(self.chain_id)?;

        match self.settlement {
            Some(contracts) => registry.with_settlement(self.chain_id, contracts),
            None => Ok(registry),
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a slippage percentage string into basis points.
pub fn parse_slippage(value: &str) -> Result<u32, AppError> {
    let percent = Decimal::from_str(value.trim())
        .map_err(|e| AppError::Config(format!("Invalid slippage tolerance '{}': {}", value, e)))?;
    slippage_percent_to_bps(percent).map_err(AppError::Config)
}

fn parse_address(name: &str, value: &str) -> Result<Address, AppError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| AppError::Config(format!("Invalid {} '{}': {}", name, value, e)))
}

fn parse_settlement(
    atlas: Option<String>,
    verification: Option<String>,
    dapp_control: Option<String>,
) -> Result<Option<SettlementContracts>, AppError> {
    match (atlas, verification, dapp_control) {
        (None, None, None) => Ok(None),
        (Some(atlas), Some(verification), Some(dapp_control)) => Ok(Some(SettlementContracts {
            atlas: parse_address("ATLAS_ADDRESS", &atlas)?,
            atlas_verification: parse_address("ATLAS_VERIFICATION_ADDRESS", &verification)?,
            dapp_control: parse_address("DAPP_CONTROL_ADDRESS", &dapp_control)?,
        })),
        _ => Err(AppError::Config(
            "ATLAS_ADDRESS, ATLAS_VERIFICATION_ADDRESS and DAPP_CONTROL_ADDRESS must be set together"
                .into(),
        )),
    }
}
