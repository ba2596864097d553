//! Swap routing and quoting types.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

use crate::ethereum::constants::BPS_DENOMINATOR;

/// Liquidity venue a route is executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exchange {
    /// Uniswap V2 style router (QuickSwap on Polygon).
    UniswapV2,
    /// Uniswap V3 SwapRouter with fee-tier pools.
    UniswapV3,
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::UniswapV2 => write!(f, "uniswap_v2"),
            Exchange::UniswapV3 => write!(f, "uniswap_v3"),
        }
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniswap_v2" | "uniswapv2" | "v2" => Ok(Exchange::UniswapV2),
            "uniswap_v3" | "uniswapv3" | "v3" => Ok(Exchange::UniswapV3),
            _ => Err(format!("Invalid exchange: {}. Use 'uniswap_v2' or 'uniswap_v3'", s)),
        }
    }
}

/// Kind of quote being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapType {
    /// Fixed input amount, output is quoted.
    ExactIn,
    /// Fixed output amount, input is quoted.
    ExactOut,
    /// Native asset to wrapped native, 1:1.
    Wrap,
    /// Wrapped native to native asset, 1:1.
    Unwrap,
}

impl SwapType {
    /// Whether this is a plain wrap or unwrap.
    pub fn is_wrap(&self) -> bool {
        matches!(self, SwapType::Wrap | SwapType::Unwrap)
    }
}

/// Direction of a user swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
    /// The user fixes the amount sold.
    #[default]
    ExactIn,
    /// The user fixes the amount bought.
    ExactOut,
}

impl FromStr for SwapDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact_in" | "sell" => Ok(SwapDirection::ExactIn),
            "exact_out" | "buy" => Ok(SwapDirection::ExactOut),
            _ => Err(format!("Invalid direction: {}. Use 'exact_in' or 'exact_out'", s)),
        }
    }
}

impl From<SwapDirection> for SwapType {
    fn from(direction: SwapDirection) -> Self {
        match direction {
            SwapDirection::ExactIn => SwapType::ExactIn,
            SwapDirection::ExactOut => SwapType::ExactOut,
        }
    }
}

/// Venue-specific data attached to a swap step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepExtra {
    /// The venue needs nothing beyond the token pair.
    None,
    /// Uniswap V3 pool fee in hundredths of a basis point.
    FeeTier(u32),
}

/// One atomic exchange hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStep {
    pub token_in: Address,
    pub token_out: Address,
    pub extra: StepExtra,
}

impl SwapStep {
    /// Create a step that carries no venue data.
    pub fn new(token_in: Address, token_out: Address) -> Self {
        Self { token_in, token_out, extra: StepExtra::None }
    }

    /// Create a step through a fee-tier pool.
    pub fn with_fee(token_in: Address, token_out: Address, fee: u32) -> Self {
        Self { token_in, token_out, extra: StepExtra::FeeTier(fee) }
    }

    /// Pool fee for this step, if the venue uses one.
    pub fn fee_tier(&self) -> Option<u32> {
        match self.extra {
            StepExtra::FeeTier(fee) => Some(fee),
            StepExtra::None => None,
        }
    }
}

/// Ordered sequence of swap steps on a single exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub chain_id: u64,
    pub exchange: Exchange,
    pub steps: Vec<SwapStep>,
    /// The user sells the chain's native asset (routed as wrapped native).
    pub is_from_native: bool,
    /// The user buys the chain's native asset (routed as wrapped native).
    pub is_to_native: bool,
}

impl SwapRoute {
    /// Token entering the first step.
    pub fn token_in(&self) -> Option<Address> {
        self.steps.first().map(|s| s.token_in)
    }

    /// Token leaving the last step.
    pub fn token_out(&self) -> Option<Address> {
        self.steps.last().map(|s| s.token_out)
    }

    /// Token addresses visited by the route, in order.
    pub fn path(&self) -> Vec<Address> {
        let mut path = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            path.push(first.token_in);
        }
        path.extend(self.steps.iter().map(|s| s.token_out));
        path
    }

    /// Every step's output feeds the next step's input.
    pub fn is_continuous(&self) -> bool {
        !self.steps.is_empty() && self.steps.windows(2).all(|w| w[0].token_out == w[1].token_in)
    }
}

/// Request to quote a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub swap_type: SwapType,
    /// Amount in for exact-in, amount out for exact-out.
    pub amount: U256,
    pub route: SwapRoute,
}

/// Quoted amounts for a route.
///
/// Amounts are raw integers in each token's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteResult {
    pub swap_type: SwapType,
    pub amount_in: U256,
    pub amount_out: U256,
    pub route: SwapRoute,
    /// Price impact in percent, only computed for the selected quote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_impact: Option<Decimal>,
}

impl QuoteResult {
    /// Minimum output the user accepts. Exact-out and wrap quotes are fixed.
    pub fn min_amount_out(&self, slippage_bps: u32) -> U256 {
        match self.swap_type {
            SwapType::ExactIn => apply_slippage_down(self.amount_out, slippage_bps),
            _ => self.amount_out,
        }
    }

    /// Maximum input the user accepts. Exact-in and wrap quotes are fixed.
    pub fn max_amount_in(&self, slippage_bps: u32) -> U256 {
        match self.swap_type {
            SwapType::ExactOut => apply_slippage_up(self.amount_in, slippage_bps),
            _ => self.amount_in,
        }
    }
}

/// Reduce an amount by a slippage tolerance, rounding down.
pub fn apply_slippage_down(amount: U256, slippage_bps: u32) -> U256 {
    let bps = U256::from(slippage_bps.min(BPS_DENOMINATOR as u32));
    let denominator = U256::from(BPS_DENOMINATOR);
    amount.saturating_mul(denominator - bps) / denominator
}

/// Increase an amount by a slippage tolerance, rounding down.
pub fn apply_slippage_up(amount: U256, slippage_bps: u32) -> U256 {
    let denominator = U256::from(BPS_DENOMINATOR);
    amount.saturating_mul(denominator + U256::from(slippage_bps)) / denominator
}

/// Convert a slippage percentage (e.g. `0.5`) into basis points.
pub fn slippage_percent_to_bps(percent: Decimal) -> Result<u32, String> {
    if percent < Decimal::ZERO || percent > Decimal::from(50) {
        return Err("slippage_tolerance must be between 0 and 50 (percentage)".to_string());
    }

    let bps = (percent * Decimal::from(100)).trunc();
    bps.to_u32().ok_or_else(|| format!("Invalid slippage tolerance: {}", percent))
}
