//! Swap orchestration service.
//!
//! Resolves tokens, finds routes, picks the best quote and turns it into
//! signed settlement data for the configured wallet.

use std::sync::Arc;

use alloy::primitives::{B256, U256};
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Serialize;

use crate::{
    config::{ChainConfig, ChainRegistry, Config},
    error::{AppError, Result},
    ethereum::{wallet::TypedDataSigner, ChainReader},
    exchanges::{ExchangeAdapter, ExchangeRegistry},
    services::{
        operation_builder::{OperationBuilder, SettlementContract},
        quote_aggregator::QuoteAggregator,
        route_builder::RouteBuilder,
        signing::{
            approval_requirement, sign_user_operation, AllowanceManager, ApprovalRequest,
            SwapProcess, SwapSubmitter,
        },
        token_directory::{ChainTokens, TokenDirectory, TokenSource},
    },
    types::{
        parse_units, Exchange, QuoteRequest, QuoteResult, SwapCallData, SwapDirection, SwapRoute,
        SwapStep, SwapType, Token,
    },
};

/// Routing defaults applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSettings {
    pub chain_id: u64,
    pub exchange: Exchange,
    pub slippage_bps: u32,
    pub deadline_minutes: u64,
}

impl From<&Config> for SwapSettings {
    fn from(config: &Config) -> Self {
        Self {
            chain_id: config.chain_id,
            exchange: config.exchange,
            slippage_bps: config.slippage_bps,
            deadline_minutes: config.deadline_minutes,
        }
    }
}

/// Severity of a quote's price impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceImpactLevel {
    Normal,
    Warning,
    Critical,
}

impl PriceImpactLevel {
    /// Classify a price impact given in percent.
    pub fn from_percent(percent: Decimal) -> Self {
        if percent >= Decimal::from(5) {
            PriceImpactLevel::Critical
        } else if percent >= Decimal::from(3) {
            PriceImpactLevel::Warning
        } else {
            PriceImpactLevel::Normal
        }
    }
}

/// Routes found for a resolved token pair.
#[derive(Debug, Clone)]
pub struct PairRoutes {
    pub from_token: Token,
    pub to_token: Token,
    pub routes: Vec<SwapRoute>,
}

/// Best quote for a resolved token pair.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub from_token: Token,
    pub to_token: Token,
    pub quote: QuoteResult,
}

impl SwapQuote {
    pub fn price_impact_level(&self) -> Option<PriceImpactLevel> {
        self.quote.price_impact.map(PriceImpactLevel::from_percent)
    }
}

/// A quote turned into settlement data.
#[derive(Debug, Clone)]
pub struct PreparedSwap {
    pub quote: SwapQuote,
    pub call_data: SwapCallData,
    /// Allowance the swapper still has to grant, if any.
    pub approval: Option<ApprovalRequest>,
    pub slippage_bps: u32,
}

/// Service for routing, quoting and building swaps.
#[derive(Clone)]
pub struct SwapService {
    reader: Arc<dyn ChainReader>,
    signer: Arc<dyn TypedDataSigner>,
    chains: Arc<ChainRegistry>,
    directory: Arc<TokenDirectory>,
    exchanges: ExchangeRegistry,
    routes: RouteBuilder,
    aggregator: QuoteAggregator,
    operations: OperationBuilder,
    settings: SwapSettings,
}

impl SwapService {
    /// Create a new swap service.
    pub fn new(
        reader: Arc<dyn ChainReader>,
        signer: Arc<dyn TypedDataSigner>,
        token_source: Arc<dyn TokenSource>,
        settlement: Arc<dyn SettlementContract>,
        chains: Arc<ChainRegistry>,
        settings: SwapSettings,
    ) -> Self {
        let exchanges = ExchangeRegistry::new();
        let directory = Arc::new(TokenDirectory::new(token_source, chains.clone()));

        Self {
            routes: RouteBuilder::new(directory.clone(), exchanges.clone()),
            aggregator: QuoteAggregator::new(reader.clone(), exchanges.clone(), chains.clone()),
            operations: OperationBuilder::new(
                reader.clone(),
                settlement,
                exchanges.clone(),
                chains.clone(),
            ),
            reader,
            signer,
            chains,
            directory,
            exchanges,
            settings,
        }
    }

    pub fn settings(&self) -> &SwapSettings {
        &self.settings
    }

    /// Configuration of the routed chain.
    pub fn chain(&self) -> Result<&ChainConfig> {
        self.chains.get(self.settings.chain_id)
    }

    /// Token directory of the service.
    pub fn directory(&self) -> &Arc<TokenDirectory> {
        &self.directory
    }

    /// Resolve both sides of a swap by symbol or address.
    pub async fn resolve_pair(&self, from: &str, to: &str) -> Result<(Token, Token)> {
        let chain_id = self.settings.chain_id;
        let from_token = self.directory.resolve(chain_id, from).await?;
        let to_token = self.directory.resolve(chain_id, to).await?;
        Ok((from_token, to_token))
    }

    /// Candidate routes between two tokens on the configured exchange.
    pub async fn get_swap_routes(&self, from: &str, to: &str) -> Result<PairRoutes> {
        let (from_token, to_token) = self.resolve_pair(from, to).await?;
        let routes = self
            .routes
            .get_swap_routes(
                from_token.address,
                to_token.address,
                self.settings.chain_id,
                self.settings.exchange,
            )
            .await?;

        Ok(PairRoutes { from_token, to_token, routes })
    }

    /// Best quote for a human-readable `amount`.
    ///
    /// Exact-in amounts are in units of the sold token, exact-out amounts in
    /// units of the bought token. `None` means no route could be quoted.
    pub async fn get_quote(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        direction: SwapDirection,
    ) -> Result<Option<SwapQuote>> {
        let (from_token, to_token) = self.resolve_pair(from, to).await?;
        let decimals = match direction {
            SwapDirection::ExactIn => from_token.decimals,
            SwapDirection::ExactOut => to_token.decimals,
        };
        let amount = parse_units(amount, decimals).map_err(AppError::Parse)?;

        self.quote_tokens(from_token, to_token, amount, direction).await
    }

    /// Best quote for a raw `amount` between resolved tokens.
    pub async fn quote_tokens(
        &self,
        from_token: Token,
        to_token: Token,
        amount: U256,
        direction: SwapDirection,
    ) -> Result<Option<SwapQuote>> {
        tracing::info!(
            from = %from_token.symbol,
            to = %to_token.symbol,
            amount = %amount,
            direction = ?direction,
            "Quoting swap"
        );

        let chain_id = self.settings.chain_id;
        let tokens = self.directory.tokens(chain_id).await?;

        if let Some(swap_type) = wrap_type(&tokens, &from_token, &to_token) {
            let quote = QuoteResult {
                swap_type,
                amount_in: amount,
                amount_out: amount,
                route: SwapRoute {
                    chain_id,
                    exchange: self.settings.exchange,
                    steps: vec![SwapStep::new(from_token.address, to_token.address)],
                    is_from_native: swap_type == SwapType::Wrap,
                    is_to_native: swap_type == SwapType::Unwrap,
                },
                price_impact: Some(Decimal::ZERO),
            };
            return Ok(Some(SwapQuote { from_token, to_token, quote }));
        }

        let routes = self
            .routes
            .get_swap_routes(from_token.address, to_token.address, chain_id, self.settings.exchange)
            .await?;
        let Some(mut quote) = self.aggregator.get_best_quote(amount, &routes, direction).await
        else {
            return Ok(None);
        };

        quote.price_impact = self.price_impact(&quote).await;
        match quote.price_impact.map(PriceImpactLevel::from_percent) {
            Some(PriceImpactLevel::Critical) => tracing::warn!(
                price_impact = %quote.price_impact.unwrap_or_default(),
                "Critical price impact"
            ),
            Some(PriceImpactLevel::Warning) => tracing::warn!(
                price_impact = %quote.price_impact.unwrap_or_default(),
                "High price impact"
            ),
            _ => {}
        }

        Ok(Some(SwapQuote { from_token, to_token, quote }))
    }

    /// Quote and build unsigned settlement data for the configured wallet.
    pub async fn prepare_swap(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        direction: SwapDirection,
        slippage_bps: Option<u32>,
    ) -> Result<PreparedSwap> {
        let quote = self.get_quote(from, to, amount, direction).await?.ok_or_else(|| {
            AppError::NotFound(format!("No quote available for {} -> {}", from, to))
        })?;
        let slippage_bps = slippage_bps.unwrap_or(self.settings.slippage_bps);
        let swapper = self.signer.address();

        let call_data = self
            .operations
            .build_call_data(&quote.quote, swapper, slippage_bps, self.settings.deadline_minutes)
            .await?;

        let spender = self.chain()?.settlement()?.dapp_control;
        let approval = approval_requirement(
            self.reader.as_ref(),
            &quote.quote,
            swapper,
            spender,
            slippage_bps,
        )
        .await?;

        Ok(PreparedSwap { quote, call_data, approval, slippage_bps })
    }

    /// Build settlement data and sign its user operation with the wallet.
    ///
    /// Nothing is submitted. Wraps carry no user operation and stay unsigned.
    pub async fn build_swap(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        direction: SwapDirection,
        slippage_bps: Option<u32>,
    ) -> Result<PreparedSwap> {
        let mut prepared = self.prepare_swap(from, to, amount, direction, slippage_bps).await?;

        if let Some(operation) = prepared.call_data.user_operation_mut() {
            let domain = self.chain()?.eip712_domain()?;
            sign_user_operation(self.signer.as_ref(), operation, &domain).await?;
            tracing::info!(signer = %self.signer.address(), "Signed user operation");
        }

        Ok(prepared)
    }

    /// Block explorer link for a submitted transaction.
    pub fn tx_url(&self, tx_hash: B256) -> Result<String> {
        Ok(self.chain()?.tx_url(&tx_hash.to_string()))
    }

    /// Signing process bound to the wallet and the routed chain.
    pub fn swap_process(
        &self,
        allowances: Arc<dyn AllowanceManager>,
        submitter: Arc<dyn SwapSubmitter>,
    ) -> Result<SwapProcess> {
        let domain = self.chain()?.eip712_domain()?;
        Ok(SwapProcess::new(self.signer.clone(), allowances, submitter, domain))
    }

    /// Price impact of `quote` in percent, against a small reference trade
    /// on the same route.
    async fn price_impact(&self, quote: &QuoteResult) -> Option<Decimal> {
        let adapter = self.exchanges.get(quote.route.exchange).ok()?;
        let chain = self.chains.get(quote.route.chain_id).ok()?;
        let reference_in = reference_amount(quote.amount_in);

        let request = QuoteRequest {
            swap_type: SwapType::ExactIn,
            amount: reference_in,
            route: quote.route.clone(),
        };
        let reference = adapter.get_quote(self.reader.as_ref(), chain, &request).await?;

        let impact = price_impact_percent(
            quote.amount_in,
            quote.amount_out,
            reference_in,
            reference.amount_out,
        );
        if impact.is_none() {
            tracing::debug!(path = ?quote.route.path(), "Price impact unavailable");
        }
        impact
    }
}

/// Wrap or unwrap when the pair is the native token and its wrapped form.
fn wrap_type(tokens: &ChainTokens, from: &Token, to: &Token) -> Option<SwapType> {
    let native = tokens.native().address;
    let wrapped = tokens.wrapped_native().address;

    if from.address == native && to.address == wrapped {
        Some(SwapType::Wrap)
    } else if from.address == wrapped && to.address == native {
        Some(SwapType::Unwrap)
    } else {
        None
    }
}

/// Reference input used to approximate the spot rate.
///
/// 0.1% of the input, at least 1000 units but never more than the input, and
/// at most 10% of it.
pub fn reference_amount(amount_in: U256) -> U256 {
    let reference = amount_in / U256::from(1000);
    let min_reference = U256::from(1_000u64);
    let max_reference = amount_in / U256::from(10);

    if reference < min_reference {
        min_reference.min(amount_in)
    } else if reference > max_reference {
        max_reference
    } else {
        reference
    }
}

/// Shortfall of the execution rate against the reference rate, in percent
/// with four decimals. Never negative.
pub fn price_impact_percent(
    amount_in: U256,
    amount_out: U256,
    reference_in: U256,
    reference_out: U256,
) -> Option<Decimal> {
    let to_decimal = |value: U256| -> Option<Decimal> {
        let value: u128 = value.try_into().ok()?;
        Decimal::from_u128(value)
    };

    let amount_in = to_decimal(amount_in)?;
    let reference_out = to_decimal(reference_out)?;
    if amount_in.is_zero() || reference_out.is_zero() {
        return Some(Decimal::ZERO);
    }

    // (amount_out / amount_in) / (reference_out / reference_in)
    let numerator = to_decimal(amount_out)?.checked_mul(to_decimal(reference_in)?)?;
    let denominator = reference_out.checked_mul(amount_in)?;
    let ratio = numerator.checked_div(denominator)?;

    let impact = (Decimal::ONE - ratio) * Decimal::from(100);
    Some(impact.max(Decimal::ZERO).round_dp(4))
}
