//! Per-chain configuration.

use std::collections::HashMap;

use alloy::{primitives::Address, sol_types::Eip712Domain};

use crate::{
    error::{AppError, Result},
    ethereum::constants::{
        ATLAS_EIP712_NAME, ATLAS_EIP712_VERSION, ETHEREUM_MAINNET_CHAIN_ID, NATIVE_TOKEN_ADDRESS,
        POLYGON_CHAIN_ID, POLYGON_USDC_ADDRESS, QUICKSWAP_V2_ROUTER, UNISWAP_V2_ROUTER,
        UNISWAP_V3_QUOTER, UNISWAP_V3_ROUTER, USDC_ADDRESS, WETH_ADDRESS, WMATIC_ADDRESS,
    },
    types::{Exchange, Token},
};

/// Atlas contracts deployed on a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementContracts {
    /// Atlas entry point.
    pub atlas: Address,
    /// Verification contract, the EIP-712 verifying contract.
    pub atlas_verification: Address,
    /// FastLane Online dapp control.
    pub dapp_control: Address,
}

/// Read-only constants for a chain.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub native_symbol: String,
    pub native_name: String,
    pub native_decimals: u8,
    pub wrapped_native: Address,
    /// High-liquidity intermediate token for two-hop routes.
    pub gateway: Address,
    /// Average block time in milliseconds.
    pub block_time_ms: u64,
    pub explorer_url: String,
    pub v2_router: Address,
    pub v3_router: Address,
    pub v3_quoter: Address,
    pub settlement: Option<SettlementContracts>,
}

impl ChainConfig {
    pub fn polygon() -> Self {
        Self {
            chain_id: POLYGON_CHAIN_ID,
            name: "Polygon".to_string(),
            native_symbol: "POL".to_string(),
            native_name: "Polygon Ecosystem Token".to_string(),
            native_decimals: 18,
            wrapped_native: WMATIC_ADDRESS,
            gateway: POLYGON_USDC_ADDRESS,
            block_time_ms: 2_000,
            explorer_url: "https://polygonscan.com".to_string(),
            v2_router: QUICKSWAP_V2_ROUTER,
            v3_router: UNISWAP_V3_ROUTER,
            v3_quoter: UNISWAP_V3_QUOTER,
            settlement: None,
        }
    }

    pub fn mainnet() -> Self {
        Self {
            chain_id: ETHEREUM_MAINNET_CHAIN_ID,
            name: "Ethereum".to_string(),
            native_symbol: "ETH".to_string(),
            native_name: "Ether".to_string(),
            native_decimals: 18,
            wrapped_native: WETH_ADDRESS,
            gateway: USDC_ADDRESS,
            block_time_ms: 12_000,
            explorer_url: "https://etherscan.io".to_string(),
            v2_router: UNISWAP_V2_ROUTER,
            v3_router: UNISWAP_V3_ROUTER,
            v3_quoter: UNISWAP_V3_QUOTER,
            settlement: None,
        }
    }

    /// Token entry for the chain's native asset.
    pub fn native_token(&self) -> Token {
        Token::new(
            self.chain_id,
            NATIVE_TOKEN_ADDRESS,
            self.native_decimals,
            &self.native_symbol,
            &self.native_name,
        )
    }

    pub fn settlement(&self) -> Result<&SettlementContracts> {
        self.settlement.as_ref().ok_or(AppError::ChainNotConfigured(self.chain_id))
    }

    /// Typed-data domain of the Atlas verification contract.
    pub fn eip712_domain(&self) -> Result<Eip712Domain> {
        let settlement = self.settlement()?;
        Ok(Eip712Domain::new(
            Some(ATLAS_EIP712_NAME.into()),
            Some(ATLAS_EIP712_VERSION.into()),
            Some(alloy::primitives::U256::from(self.chain_id)),
            Some(settlement.atlas_verification),
            None,
        ))
    }

    /// Router that executes swaps for `exchange`.
    pub fn router(&self, exchange: Exchange) -> Address {
        match exchange {
            Exchange::UniswapV2 => self.v2_router,
            Exchange::UniswapV3 => self.v3_router,
        }
    }

    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

/// Chain configurations keyed by chain ID.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainConfig>,
}

impl ChainRegistry {
    /// Registry with every built-in chain.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.insert(ChainConfig::polygon());
        registry.insert(ChainConfig::mainnet());
        registry
    }

    pub fn insert(&mut self, chain: ChainConfig) {
        self.chains.insert(chain.chain_id, chain);
    }

    pub fn get(&self, chain_id: u64) -> Result<&ChainConfig> {
        self.chains.get(&chain_id).ok_or(AppError::ChainNotConfigured(chain_id))
    }

    /// Attach settlement contracts to a configured chain.
    pub fn with_settlement(mut self, chain_id: u64, contracts: SettlementContracts) -> Result<Self> {
        let chain = self.chains.get_mut(&chain_id).ok_or(AppError::ChainNotConfigured(chain_id))?;
        chain.settlement = Some(contracts);
        Ok(self)
    }
}
