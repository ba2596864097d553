//! Exchange adapters.
//!
//! Each liquidity venue implements [`ExchangeAdapter`]. The routing and
//! operation pipeline only talks to the trait and looks adapters up in an
//! [`ExchangeRegistry`].

pub mod uniswap_v2;
pub mod uniswap_v3;

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::{
    config::ChainConfig,
    error::{AppError, Result},
    ethereum::ChainReader,
    types::{QuoteRequest, QuoteResult, SwapStep},
};

pub use crate::types::Exchange;
pub use uniswap_v2::UniswapV2Adapter;
pub use uniswap_v3::UniswapV3Adapter;

/// A read-only contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
}

/// Venue-specific routing, quoting and calldata encoding.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Possible single hops between two tokens on this venue.
    fn build_swap_steps(&self, from: Address, to: Address) -> Vec<SwapStep>;

    /// Quoter call that prices `request`.
    fn quote_contract_call(&self, chain: &ChainConfig, request: &QuoteRequest)
        -> Result<ContractCall>;

    /// Decode the raw quoter response into a quote result.
    fn format_quote_result(&self, request: &QuoteRequest, raw: &[u8]) -> Result<QuoteResult>;

    /// Router calldata executing `quote` for `recipient`.
    fn swap_calldata(
        &self,
        chain: &ChainConfig,
        quote: &QuoteResult,
        recipient: Address,
        slippage_bps: u32,
        deadline: U256,
    ) -> Result<Bytes>;

    /// Quote a single candidate route.
    ///
    /// Reverts and decoding failures exclude the route and return `None`. A
    /// zero amount quotes zero, provided the route quotes a unit amount.
    async fn get_quote(
        &self,
        reader: &dyn ChainReader,
        chain: &ChainConfig,
        request: &QuoteRequest,
    ) -> Option<QuoteResult> {
        if request.amount.is_zero() {
            let unit = QuoteRequest { amount: U256::from(1u8), ..request.clone() };
            self.fetch_quote(reader, chain, &unit).await?;
            return Some(QuoteResult {
                swap_type: request.swap_type,
                amount_in: U256::ZERO,
                amount_out: U256::ZERO,
                route: request.route.clone(),
                price_impact: None,
            });
        }

        self.fetch_quote(reader, chain, request).await
    }

    /// Run the quoter for `request` and format its reply.
    async fn fetch_quote(
        &self,
        reader: &dyn ChainReader,
        chain: &ChainConfig,
        request: &QuoteRequest,
    ) -> Option<QuoteResult> {
        let call = match self.quote_contract_call(chain, request) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(exchange = %self.exchange(), error = %e, "Cannot build quote call");
                return None;
            }
        };

        let raw = match reader.call_contract(call.to, call.data, None).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(
                    exchange = %self.exchange(),
                    path = ?request.route.path(),
                    error = %e,
                    "Route quote failed"
                );
                return None;
            }
        };

        match self.format_quote_result(request, &raw) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(exchange = %self.exchange(), error = %e, "Malformed quote response");
                None
            }
        }
    }
}

/// Lookup table from exchange to adapter.
#[derive(Clone)]
pub struct ExchangeRegistry {
    adapters: HashMap<Exchange, Arc<dyn ExchangeAdapter>>,
}

impl ExchangeRegistry {
    /// Registry with every built-in adapter.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(UniswapV2Adapter));
        registry.register(Arc::new(UniswapV3Adapter));
        registry
    }

    pub fn empty() -> Self {
        Self { adapters: HashMap::new() }
    }

    pub fn register(&mut self, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert(adapter.exchange(), adapter);
    }

    pub fn get(&self, exchange: Exchange) -> Result<Arc<dyn ExchangeAdapter>> {
        self.adapters
            .get(&exchange)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedExchange(exchange.to_string()))
    }
}

impl Default for ExchangeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRegistry").field("exchanges", &self.adapters.keys()).finish()
    }
}
