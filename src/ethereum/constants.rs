//! Ethereum network constants.
//!
//! Contains chain IDs, well-known token and router addresses, and the fixed
//! gas estimates used when building settlement operations.

use alloy::primitives::{address, Address};

// ============================================================================
// Chain IDs
// ============================================================================

/// Ethereum Mainnet chain ID.
pub const ETHEREUM_MAINNET_CHAIN_ID: u64 = 1;

/// Polygon PoS chain ID.
pub const POLYGON_CHAIN_ID: u64 = 137;

/// Default chain ID (Polygon).
pub const DEFAULT_CHAIN_ID: u64 = POLYGON_CHAIN_ID;

/// Address used to represent the chain's native asset in token lists and intents.
pub const NATIVE_TOKEN_ADDRESS: Address = Address::ZERO;

// ============================================================================
// Core Token Addresses (Ethereum Mainnet)
// ============================================================================

/// Wrapped Ether (WETH) address on Ethereum Mainnet.
pub const WETH_ADDRESS: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// USDC address on Ethereum Mainnet.
pub const USDC_ADDRESS: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

// ============================================================================
// Core Token Addresses (Polygon)
// ============================================================================

/// Wrapped MATIC (WMATIC) address on Polygon.
pub const WMATIC_ADDRESS: Address = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");

/// Bridged USDC (USDC.e) address on Polygon.
pub const POLYGON_USDC_ADDRESS: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");

// ============================================================================
// Router Addresses
// ============================================================================

/// Uniswap V2 Router address on Ethereum Mainnet.
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");

/// QuickSwap (Uniswap V2 fork) router address on Polygon.
pub const QUICKSWAP_V2_ROUTER: Address = address!("a5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff");

/// Uniswap V3 SwapRouter address (same deployment on Mainnet and Polygon).
pub const UNISWAP_V3_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");

/// Uniswap V3 Quoter V2 address (same deployment on Mainnet and Polygon).
pub const UNISWAP_V3_QUOTER: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");

// ============================================================================
// Settlement Parameters
// ============================================================================

/// EIP-712 domain name of the Atlas verification contract.
pub const ATLAS_EIP712_NAME: &str = "AtlasVerification";

/// EIP-712 domain version of the Atlas verification contract.
pub const ATLAS_EIP712_VERSION: &str = "1.0";

/// Gas reserved for executing the baseline swap.
pub const SWAP_GAS_ESTIMATE: u64 = 350_000;

/// Gas reserved for solver execution inside the settlement contract.
pub const SOLVER_GAS_ESTIMATE: u64 = 500_000;

/// Gas limit for plain wrap / unwrap transactions.
pub const WRAP_GAS_ESTIMATE: u64 = 50_000;

/// Settlement gas surcharge in basis points (10%).
pub const ATLAS_GAS_SURCHARGE_BPS: u64 = 1_000;

/// Basis point denominator.
pub const BPS_DENOMINATOR: u64 = 10_000;
