//! Uniswap V2 style router adapter.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;

use crate::{
    config::ChainConfig,
    error::{AppError, Result},
    ethereum::contracts::uniswap_v2::IUniswapV2Router02,
    exchanges::{ContractCall, ExchangeAdapter},
    types::{Exchange, QuoteRequest, QuoteResult, SwapStep, SwapType},
};

/// Adapter for Uniswap V2 routers and forks (QuickSwap).
///
/// A V2 pair is unique per token pair, so every hop has exactly one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapV2Adapter;

#[async_trait]
impl ExchangeAdapter for UniswapV2Adapter {
    fn exchange(&self) -> Exchange {
        Exchange::UniswapV2
    }

    fn build_swap_steps(&self, from: Address, to: Address) -> Vec<SwapStep> {
        vec![SwapStep::new(from, to)]
    }

    fn quote_contract_call(
        &self,
        chain: &ChainConfig,
        request: &QuoteRequest,
    ) -> Result<ContractCall> {
        let path = request.route.path();

        let data = match request.swap_type {
            SwapType::ExactIn => {
                IUniswapV2Router02::getAmountsOutCall { amountIn: request.amount, path }
                    .abi_encode()
            }
            SwapType::ExactOut => {
                IUniswapV2Router02::getAmountsInCall { amountOut: request.amount, path }
                    .abi_encode()
            }
            SwapType::Wrap | SwapType::Unwrap => {
                return Err(AppError::Parse("wrap requests are not quoted by a router".into()))
            }
        };

        Ok(ContractCall { to: chain.v2_router, data: Bytes::from(data) })
    }

    fn format_quote_result(&self, request: &QuoteRequest, raw: &[u8]) -> Result<QuoteResult> {
        let amounts: Vec<U256> = match request.swap_type {
            SwapType::ExactOut => IUniswapV2Router02::getAmountsInCall::abi_decode_returns(raw)?,
            _ => IUniswapV2Router02::getAmountsOutCall::abi_decode_returns(raw)?,
        };

        let (Some(first), Some(last)) = (amounts.first(), amounts.last()) else {
            return Err(AppError::Parse("router returned no amounts".into()));
        };

        Ok(QuoteResult {
            swap_type: request.swap_type,
            amount_in: *first,
            amount_out: *last,
            route: request.route.clone(),
            price_impact: None,
        })
    }

    fn swap_calldata(
        &self,
        _chain: &ChainConfig,
        quote: &QuoteResult,
        recipient: Address,
        slippage_bps: u32,
        deadline: U256,
    ) -> Result<Bytes> {
        let route = &quote.route;
        let path = route.path();
        let to = recipient;

        let data = match (quote.swap_type, route.is_from_native, route.is_to_native) {
            (SwapType::ExactIn, true, _) => IUniswapV2Router02::swapExactETHForTokensCall {
                amountOutMin: quote.min_amount_out(slippage_bps),
                path,
                to,
                deadline,
            }
            .abi_encode(),
            (SwapType::ExactIn, false, true) => IUniswapV2Router02::swapExactTokensForETHCall {
                amountIn: quote.amount_in,
                amountOutMin: quote.min_amount_out(slippage_bps),
                path,
                to,
                deadline,
            }
            .abi_encode(),
            (SwapType::ExactIn, false, false) => {
                IUniswapV2Router02::swapExactTokensForTokensCall {
                    amountIn: quote.amount_in,
                    amountOutMin: quote.min_amount_out(slippage_bps),
                    path,
                    to,
                    deadline,
                }
                .abi_encode()
            }
            (SwapType::ExactOut, true, _) => IUniswapV2Router02::swapETHForExactTokensCall {
                amountOut: quote.amount_out,
                path,
                to,
                deadline,
            }
            .abi_encode(),
            (SwapType::ExactOut, false, true) => IUniswapV2Router02::swapTokensForExactETHCall {
                amountOut: quote.amount_out,
                amountInMax: quote.max_amount_in(slippage_bps),
                path,
                to,
                deadline,
            }
            .abi_encode(),
            (SwapType::ExactOut, false, false) => {
                IUniswapV2Router02::swapTokensForExactTokensCall {
                    amountOut: quote.amount_out,
                    amountInMax: quote.max_amount_in(slippage_bps),
                    path,
                    to,
                    deadline,
                }
                .abi_encode()
            }
            (SwapType::Wrap | SwapType::Unwrap, _, _) => {
                return Err(AppError::OperationConstruction(
                    "wrap quotes have no router calldata".into(),
                ))
            }
        };

        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::testing::MockChain;
    use crate::types::SwapRoute;
    use alloy::primitives::address;

    const USDC: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");
    const WMATIC: Address = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");
    const WETH: Address = address!("7ceB23fD6bC0adD59E62ac25578270cFf1b9f619");
    const RECIPIENT: Address = address!("9999999999999999999999999999999999999999");

    fn route(steps: Vec<SwapStep>, is_from_native: bool, is_to_native: bool) -> SwapRoute {
        SwapRoute {
            chain_id: 137,
            exchange: Exchange::UniswapV2,
            steps,
            is_from_native,
            is_to_native,
        }
    }

    fn request(swap_type: SwapType, amount: u64) -> QuoteRequest {
        QuoteRequest {
            swap_type,
            amount: U256::from(amount),
            route: route(
                vec![SwapStep::new(USDC, WMATIC), SwapStep::new(WMATIC, WETH)],
                false,
                false,
            ),
        }
    }

    fn amounts(values: &[u64]) -> Bytes {
        let amounts: Vec<U256> = values.iter().map(|v| U256::from(*v)).collect();
        Bytes::from(IUniswapV2Router02::getAmountsOutCall::abi_encode_returns(&amounts))
    }

    #[test]
    fn test_one_step_per_pair() {
        let steps = UniswapV2Adapter.build_swap_steps(USDC, WMATIC);
        assert_eq!(steps, vec![SwapStep::new(USDC, WMATIC)]);
    }

    #[test]
    fn test_quote_call_targets_router_with_full_path() {
        let chain = ChainConfig::polygon();
        let call = UniswapV2Adapter.quote_contract_call(&chain, &request(SwapType::ExactIn, 10)).unwrap();
        assert_eq!(call.to, chain.v2_router);

        let decoded = IUniswapV2Router02::getAmountsOutCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.amountIn, U256::from(10u64));
        assert_eq!(decoded.path, vec![USDC, WMATIC, WETH]);
    }

    #[test]
    fn test_exact_out_uses_get_amounts_in() {
        let chain = ChainConfig::polygon();
        let call =
            UniswapV2Adapter.quote_contract_call(&chain, &request(SwapType::ExactOut, 7)).unwrap();
        let decoded = IUniswapV2Router02::getAmountsInCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.amountOut, U256::from(7u64));
    }

    #[test]
    fn test_format_takes_path_endpoints() {
        let result = UniswapV2Adapter
            .format_quote_result(&request(SwapType::ExactIn, 100), &amounts(&[100, 50, 25]))
            .unwrap();
        assert_eq!(result.amount_in, U256::from(100u64));
        assert_eq!(result.amount_out, U256::from(25u64));
    }

    #[test]
    fn test_format_rejects_garbage() {
        let result =
            UniswapV2Adapter.format_quote_result(&request(SwapType::ExactIn, 100), &[0x01, 0x02]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_quote_success_and_revert() {
        let chain = ChainConfig::polygon();
        let mock = MockChain::new();
        let req = request(SwapType::ExactIn, 100);
        mock.respond(
            UniswapV2Adapter.quote_contract_call(&chain, &req).unwrap(),
            amounts(&[100, 60, 30]),
        );

        let quote = UniswapV2Adapter.get_quote(&mock, &chain, &req).await.unwrap();
        assert_eq!(quote.amount_out, U256::from(30u64));

        let unknown = request(SwapType::ExactIn, 101);
        assert!(UniswapV2Adapter.get_quote(&mock, &chain, &unknown).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_amount_on_unquotable_route_is_none() {
        let chain = ChainConfig::polygon();
        let mock = MockChain::new();

        let quote = UniswapV2Adapter.get_quote(&mock, &chain, &request(SwapType::ExactIn, 0)).await;
        assert!(quote.is_none());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_amount_on_liquid_route_quotes_zero() {
        let chain = ChainConfig::polygon();
        let mock = MockChain::new();
        mock.respond(
            UniswapV2Adapter.quote_contract_call(&chain, &request(SwapType::ExactIn, 1)).unwrap(),
            amounts(&[1, 1, 0]),
        );

        let quote = UniswapV2Adapter
            .get_quote(&mock, &chain, &request(SwapType::ExactIn, 0))
            .await
            .unwrap();
        assert_eq!(quote.amount_in, U256::ZERO);
        assert_eq!(quote.amount_out, U256::ZERO);
    }

    #[test]
    fn test_swap_calldata_exact_in_tokens() {
        let quote = QuoteResult {
            swap_type: SwapType::ExactIn,
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(2_000u64),
            route: route(vec![SwapStep::new(USDC, WETH)], false, false),
            price_impact: None,
        };

        let data = UniswapV2Adapter
            .swap_calldata(&ChainConfig::polygon(), &quote, RECIPIENT, 50, U256::from(99u64))
            .unwrap();
        let call = IUniswapV2Router02::swapExactTokensForTokensCall::abi_decode(&data).unwrap();
        assert_eq!(call.amountIn, U256::from(1_000u64));
        assert_eq!(call.amountOutMin, U256::from(1_990u64));
        assert_eq!(call.to, RECIPIENT);
        assert_eq!(call.deadline, U256::from(99u64));
    }

    #[test]
    fn test_swap_calldata_native_variants() {
        let chain = ChainConfig::polygon();
        let from_native = QuoteResult {
            swap_type: SwapType::ExactIn,
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(2_000u64),
            route: route(vec![SwapStep::new(WMATIC, USDC)], true, false),
            price_impact: None,
        };
        let data =
            UniswapV2Adapter.swap_calldata(&chain, &from_native, RECIPIENT, 0, U256::ZERO).unwrap();
        assert!(IUniswapV2Router02::swapExactETHForTokensCall::abi_decode(&data).is_ok());

        let to_native = QuoteResult {
            swap_type: SwapType::ExactOut,
            route: route(vec![SwapStep::new(USDC, WMATIC)], false, true),
            ..from_native
        };
        let data =
            UniswapV2Adapter.swap_calldata(&chain, &to_native, RECIPIENT, 100, U256::ZERO).unwrap();
        let call = IUniswapV2Router02::swapTokensForExactETHCall::abi_decode(&data).unwrap();
        assert_eq!(call.amountOut, U256::from(2_000u64));
        assert_eq!(call.amountInMax, U256::from(1_010u64));
    }
}
