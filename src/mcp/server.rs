//! MCP server implementation.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;
use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    config::Config,
    error::AppError,
    ethereum::{EthereumClient, WalletManager},
    services::{
        token_directory::ChainTokens, AtlasSettlement, PreparedSwap, PriceImpactLevel, SwapQuote,
        SwapService, SwapSettings, TokenListSource,
    },
    types::{
        format_units, slippage_percent_to_bps, BaselineCall, SwapDirection, SwapRoute, SwapType,
        Token, UserOperation,
    },
};

/// Atlas Swap MCP Server.
///
/// Provides tools for finding swap routes, quoting them and building signed
/// Atlas user operations.
#[derive(Clone)]
pub struct AtlasSwapServer {
    client: Arc<EthereumClient>,
    swap_service: SwapService,
    tool_router: ToolRouter<Self>,
}

impl AtlasSwapServer {
    /// Create a new Atlas Swap MCP Server.
    ///
    /// Note: This uses lazy initialization - no network calls are made during
    /// server startup. The RPC connection and the token list are fetched when
    /// the first tool is invoked.
    pub fn new(config: Config) -> Result<Self, AppError> {
        tracing::info!(chain_id = config.chain_id, "Initializing Atlas Swap MCP Server");

        let chains = Arc::new(config.chain_registry()?);
        let chain = chains.get(config.chain_id)?;
        if chain.settlement.is_none() {
            tracing::warn!(
                chain_id = chain.chain_id,
                "Atlas contracts not configured, build_swap is unavailable"
            );
        }

        // Initialize Ethereum client (lazy - no network call yet)
        let client = Arc::new(EthereumClient::new(&config.rpc_url)?);

        // Initialize wallet
        let wallet = Arc::new(WalletManager::from_private_key(&config.private_key)?);

        let token_source = Arc::new(TokenListSource::new(&config.token_list_url)?);
        let settlement = Arc::new(AtlasSettlement::new(client.clone()));

        let swap_service = SwapService::new(
            client.clone(),
            wallet,
            token_source,
            settlement,
            chains,
            SwapSettings::from(&config),
        );

        tracing::info!("Atlas Swap MCP Server initialized successfully");

        Ok(Self { client, swap_service, tool_router: Self::tool_router() })
    }

    /// Token directory entries of the routed chain.
    async fn chain_tokens(&self) -> Result<Arc<ChainTokens>, McpError> {
        let chain_id = self.swap_service.settings().chain_id;
        Ok(self.swap_service.directory().tokens(chain_id).await?)
    }

    /// Refuse to sign for a chain other than the one the RPC node serves.
    async fn ensure_rpc_chain(&self) -> Result<(), AppError> {
        let expected = self.swap_service.settings().chain_id;
        let connected = self.client.chain_id().await?;
        if connected != expected {
            return Err(AppError::Config(format!(
                "RPC endpoint serves chain {}, expected {}",
                connected, expected
            )));
        }
        Ok(())
    }
}

/// Input parameters for the get_swap_routes tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct GetSwapRoutesInput {
    /// Token to sell, by symbol (e.g., "USDC") or address (0x...).
    pub from_token: String,
    /// Token to buy, by symbol or address.
    pub to_token: String,
}

/// Input parameters for the get_swap_quote tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct GetSwapQuoteInput {
    /// Token to sell, by symbol (e.g., "USDC") or address (0x...).
    pub from_token: String,
    /// Token to buy, by symbol or address.
    pub to_token: String,
    /// Amount (human-readable, e.g., "1.5"). Sold amount for "exact_in",
    /// bought amount for "exact_out".
    pub amount: String,
    /// "exact_in" (default) or "exact_out".
    #[serde(default)]
    pub direction: Option<String>,
}

/// Input parameters for the build_swap tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct BuildSwapInput {
    /// Token to sell, by symbol (e.g., "USDC") or address (0x...).
    pub from_token: String,
    /// Token to buy, by symbol or address.
    pub to_token: String,
    /// Amount (human-readable, e.g., "1.5").
    pub amount: String,
    /// "exact_in" (default) or "exact_out".
    #[serde(default)]
    pub direction: Option<String>,
    /// Slippage tolerance percentage as string (e.g., "0.5" for 0.5%).
    /// Defaults to the configured tolerance.
    #[serde(default)]
    pub slippage_tolerance: Option<String>,
}

// ============================================================================
// Tool Output
// ============================================================================

/// Token as reported by the tools.
#[derive(Debug, Clone, Serialize)]
pub struct TokenOutput {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
}

impl From<&Token> for TokenOutput {
    fn from(token: &Token) -> Self {
        Self { symbol: token.symbol.clone(), address: token.address, decimals: token.decimals }
    }
}

/// One swap route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutput {
    pub exchange: String,
    /// Token symbols along the route, addresses for unknown tokens.
    pub path: Vec<String>,
    /// Pool fee tier of each hop, when the exchange has fee tiers.
    pub fee_tiers: Vec<Option<u32>>,
    pub is_from_native: bool,
    pub is_to_native: bool,
}

impl RouteOutput {
    fn new(route: &SwapRoute, tokens: &ChainTokens) -> Self {
        let path = route
            .path()
            .into_iter()
            .map(|address| {
                tokens.get(address).map_or_else(|| address.to_string(), |t| t.symbol.clone())
            })
            .collect();

        Self {
            exchange: route.exchange.to_string(),
            path,
            fee_tiers: route.steps.iter().map(|step| step.fee_tier()).collect(),
            is_from_native: route.is_from_native,
            is_to_native: route.is_to_native,
        }
    }
}

/// Result of the get_swap_routes tool.
#[derive(Debug, Clone, Serialize)]
pub struct RoutesOutput {
    pub from_token: TokenOutput,
    pub to_token: TokenOutput,
    pub routes: Vec<RouteOutput>,
}

/// Result of the get_swap_quote tool.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteOutput {
    pub from_token: TokenOutput,
    pub to_token: TokenOutput,
    pub swap_type: SwapType,
    /// Human-readable amounts.
    pub amount_in: String,
    pub amount_out: String,
    /// Raw amounts in the tokens' smallest units.
    pub amount_in_raw: String,
    pub amount_out_raw: String,
    /// Slippage-adjusted bound: minimum received for exact-in, maximum sold
    /// for exact-out.
    pub minimum_received: Option<String>,
    pub maximum_sold: Option<String>,
    pub slippage_tolerance: String,
    /// Price impact in percent.
    pub price_impact: Option<String>,
    pub price_impact_level: Option<PriceImpactLevel>,
    pub route: RouteOutput,
}

impl QuoteOutput {
    fn new(quote: &SwapQuote, slippage_bps: u32, tokens: &ChainTokens) -> Self {
        let result = &quote.quote;
        let in_decimals = quote.from_token.decimals;
        let out_decimals = quote.to_token.decimals;

        let (minimum_received, maximum_sold) = match result.swap_type {
            SwapType::ExactOut => {
                (None, Some(format_units(result.max_amount_in(slippage_bps), in_decimals)))
            }
            SwapType::ExactIn => {
                (Some(format_units(result.min_amount_out(slippage_bps), out_decimals)), None)
            }
            SwapType::Wrap | SwapType::Unwrap => {
                (Some(format_units(result.amount_out, out_decimals)), None)
            }
        };

        Self {
            from_token: TokenOutput::from(&quote.from_token),
            to_token: TokenOutput::from(&quote.to_token),
            swap_type: result.swap_type,
            amount_in: format_units(result.amount_in, in_decimals),
            amount_out: format_units(result.amount_out, out_decimals),
            amount_in_raw: result.amount_in.to_string(),
            amount_out_raw: result.amount_out.to_string(),
            minimum_received,
            maximum_sold,
            slippage_tolerance: format!("{}%", Decimal::new(i64::from(slippage_bps), 2)),
            price_impact: result.price_impact.map(|p| format!("{}%", p)),
            price_impact_level: quote.price_impact_level(),
            route: RouteOutput::new(&result.route, tokens),
        }
    }
}

/// A contract call ready to be sent.
#[derive(Debug, Clone, Serialize)]
pub struct CallOutput {
    pub to: Address,
    pub data: String,
    pub value: String,
}

impl From<&BaselineCall> for CallOutput {
    fn from(call: &BaselineCall) -> Self {
        Self { to: call.to, data: call.data.to_string(), value: call.value.to_string() }
    }
}

/// Atlas user operation fields, values as decimal strings.
#[derive(Debug, Clone, Serialize)]
pub struct UserOperationOutput {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub gas: String,
    pub max_fee_per_gas: String,
    pub nonce: String,
    pub deadline: String,
    pub dapp: Address,
    pub control: Address,
    pub call_config: u32,
    pub session_key: Address,
    pub data: String,
    pub signature: String,
}

impl From<&UserOperation> for UserOperationOutput {
    fn from(operation: &UserOperation) -> Self {
        let op = operation.as_abi();
        Self {
            from: op.from,
            to: op.to,
            value: op.value.to_string(),
            gas: op.gas.to_string(),
            max_fee_per_gas: op.maxFeePerGas.to_string(),
            nonce: op.nonce.to_string(),
            deadline: op.deadline.to_string(),
            dapp: op.dapp,
            control: op.control,
            call_config: op.callConfig,
            session_key: op.sessionKey,
            data: op.data.to_string(),
            signature: op.signature.to_string(),
        }
    }
}

/// Allowance the wallet must grant before the swap can settle.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutput {
    pub token: Address,
    pub spender: Address,
    pub amount: String,
}

/// Result of the build_swap tool.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSwapOutput {
    pub quote: QuoteOutput,
    pub baseline_call: CallOutput,
    pub user_operation: Option<UserOperationOutput>,
    pub signed: bool,
    pub min_amount_out: String,
    pub gas_limit: u64,
    /// Atlas gas surcharge in the native token.
    pub gas_surcharge: String,
    pub approval_required: Option<ApprovalOutput>,
}

impl BuildSwapOutput {
    fn new(prepared: &PreparedSwap, tokens: &ChainTokens) -> Self {
        let data = &prepared.call_data;
        let native = tokens.native();
        let out_decimals = prepared.quote.to_token.decimals;

        Self {
            quote: QuoteOutput::new(&prepared.quote, prepared.slippage_bps, tokens),
            baseline_call: CallOutput::from(data.baseline_call()),
            user_operation: data.user_operation().map(UserOperationOutput::from),
            signed: data.is_signed(),
            min_amount_out: format_units(data.min_amount_out(), out_decimals),
            gas_limit: data.gas_limit(),
            gas_surcharge: format!(
                "{} {}",
                format_units(data.gas_surcharge(), native.decimals),
                native.symbol
            ),
            approval_required: prepared.approval.map(|approval| ApprovalOutput {
                token: approval.token,
                spender: approval.spender,
                amount: approval.amount.to_string(),
            }),
        }
    }
}

fn parse_direction(direction: Option<&str>) -> Result<SwapDirection, McpError> {
    direction
        .map(|s| s.parse::<SwapDirection>().map_err(|e| McpError::invalid_params(e, None)))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn parse_slippage(slippage: Option<&str>) -> Result<Option<u32>, McpError> {
    slippage
        .map(|s| {
            let percent = Decimal::from_str(s.trim()).map_err(|e| {
                McpError::invalid_params(format!("Invalid slippage_tolerance: {}", e), None)
            })?;
            slippage_percent_to_bps(percent).map_err(|e| McpError::invalid_params(e, None))
        })
        .transpose()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

#[tool_router]
impl AtlasSwapServer {
    /// List the candidate routes between two tokens.
    ///
    /// Routes are direct hops plus two-hop routes through the wrapped native
    /// token and the chain's gateway token.
    #[tool(
        description = "List candidate swap routes between two tokens on the configured exchange. Tokens can be given by symbol or address."
    )]
    pub async fn get_swap_routes(
        &self,
        Parameters(input): Parameters<GetSwapRoutesInput>,
    ) -> Result<String, McpError> {
        tracing::info!(from = %input.from_token, to = %input.to_token, "get_swap_routes called");

        let found = self.swap_service.get_swap_routes(&input.from_token, &input.to_token).await?;
        let tokens = self.chain_tokens().await?;

        to_json(&RoutesOutput {
            from_token: TokenOutput::from(&found.from_token),
            to_token: TokenOutput::from(&found.to_token),
            routes: found.routes.iter().map(|route| RouteOutput::new(route, &tokens)).collect(),
        })
    }

    /// Quote the best route for a swap.
    ///
    /// Every candidate route is quoted on-chain and the best one is returned
    /// with its slippage bound and price impact.
    #[tool(
        description = "Get the best swap quote across all candidate routes, with minimum received (or maximum sold), slippage and price impact. Nothing is executed."
    )]
    pub async fn get_swap_quote(
        &self,
        Parameters(input): Parameters<GetSwapQuoteInput>,
    ) -> Result<String, McpError> {
        tracing::info!(
            from = %input.from_token,
            to = %input.to_token,
            amount = %input.amount,
            direction = ?input.direction,
            "get_swap_quote called"
        );

        let direction = parse_direction(input.direction.as_deref())?;
        let quote = self
            .swap_service
            .get_quote(&input.from_token, &input.to_token, &input.amount, direction)
            .await?
            .ok_or_else(|| {
                McpError::invalid_request(
                    format!("No quote available for {} -> {}", input.from_token, input.to_token),
                    None,
                )
            })?;

        let tokens = self.chain_tokens().await?;
        to_json(&QuoteOutput::new(&quote, self.swap_service.settings().slippage_bps, &tokens))
    }

    /// Build a swap and sign its Atlas user operation.
    ///
    /// Returns the baseline call and, except for wraps, the user operation
    /// signed by the configured wallet. The transaction is NOT broadcast.
    #[tool(
        description = "Build an Atlas swap: the baseline router call plus a user operation signed by the configured wallet, gas limit and surcharge, and any token approval still required. Nothing is broadcast."
    )]
    pub async fn build_swap(
        &self,
        Parameters(input): Parameters<BuildSwapInput>,
    ) -> Result<String, McpError> {
        tracing::info!(
            from = %input.from_token,
            to = %input.to_token,
            amount = %input.amount,
            direction = ?input.direction,
            slippage = ?input.slippage_tolerance,
            "build_swap called"
        );

        let direction = parse_direction(input.direction.as_deref())?;
        let slippage_bps = parse_slippage(input.slippage_tolerance.as_deref())?;
        self.ensure_rpc_chain().await?;

        let prepared = self
            .swap_service
            .build_swap(&input.from_token, &input.to_token, &input.amount, direction, slippage_bps)
            .await?;

        let tokens = self.chain_tokens().await?;
        to_json(&BuildSwapOutput::new(&prepared, &tokens))
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for AtlasSwapServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "atlas-swap-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Atlas Swap MCP Server. Provides tools for finding swap routes, \
                 quoting them, and building signed Atlas user operations."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direction() {
        assert_eq!(parse_direction(None).unwrap(), SwapDirection::ExactIn);
        assert_eq!(parse_direction(Some("exact_out")).unwrap(), SwapDirection::ExactOut);
        assert_eq!(parse_direction(Some("sell")).unwrap(), SwapDirection::ExactIn);
        assert!(parse_direction(Some("sideways")).is_err());
    }

    #[test]
    fn test_parse_slippage() {
        assert_eq!(parse_slippage(None).unwrap(), None);
        assert_eq!(parse_slippage(Some("0.5")).unwrap(), Some(50));
        assert_eq!(parse_slippage(Some(" 1 ")).unwrap(), Some(100));
        assert!(parse_slippage(Some("51")).is_err());
        assert!(parse_slippage(Some("abc")).is_err());
    }
}
