//! Uniswap V3 adapter.
//!
//! Pools are keyed by fee tier, so a token pair yields one step per tier.
//! Multi-hop routes are priced and executed with packed paths.

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;

use crate::{
    config::ChainConfig,
    error::{AppError, Result},
    ethereum::contracts::uniswap_v3::{fee_tiers, IQuoterV2, ISwapRouter},
    exchanges::{ContractCall, ExchangeAdapter},
    types::{Exchange, QuoteRequest, QuoteResult, SwapRoute, SwapStep, SwapType},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapV3Adapter;

/// Pack tokens and fees as `token (20) | fee (3) | token (20) | ...`.
pub fn encode_path(tokens: &[Address], fees: &[u32]) -> Option<Bytes> {
    if tokens.len() < 2 || fees.len() + 1 != tokens.len() {
        return None;
    }

    let mut out = Vec::with_capacity(tokens.len() * 20 + fees.len() * 3);
    out.extend_from_slice(tokens[0].as_slice());
    for (i, fee) in fees.iter().enumerate() {
        out.extend_from_slice(&fee.to_be_bytes()[1..]);
        out.extend_from_slice(tokens[i + 1].as_slice());
    }
    Some(Bytes::from(out))
}

/// Packed path of a route. Exact-output paths are encoded back to front.
fn route_path(route: &SwapRoute, reversed: bool) -> Result<Bytes> {
    let mut tokens = route.path();
    let mut fees = route
        .steps
        .iter()
        .map(|s| s.fee_tier())
        .collect::<Option<Vec<u32>>>()
        .ok_or_else(|| AppError::Parse("uniswap v3 step without fee tier".into()))?;

    if reversed {
        tokens.reverse();
        fees.reverse();
    }

    encode_path(&tokens, &fees).ok_or_else(|| AppError::Parse("invalid uniswap v3 path".into()))
}

#[async_trait]
impl ExchangeAdapter for UniswapV3Adapter {
    fn exchange(&self) -> Exchange {
        Exchange::UniswapV3
    }

    fn build_swap_steps(&self, from: Address, to: Address) -> Vec<SwapStep> {
        fee_tiers::ALL_FEES.iter().map(|fee| SwapStep::with_fee(from, to, *fee)).collect()
    }

    fn quote_contract_call(
        &self,
        chain: &ChainConfig,
        request: &QuoteRequest,
    ) -> Result<ContractCall> {
        let data = match request.swap_type {
            SwapType::ExactIn => IQuoterV2::quoteExactInputCall {
                path: route_path(&request.route, false)?,
                amountIn: request.amount,
            }
            .abi_encode(),
            SwapType::ExactOut => IQuoterV2::quoteExactOutputCall {
                path: route_path(&request.route, true)?,
                amountOut: request.amount,
            }
            .abi_encode(),
            SwapType::Wrap | SwapType::Unwrap => {
                return Err(AppError::Parse("wrap requests are not quoted by a router".into()))
            }
        };

        Ok(ContractCall { to: chain.v3_quoter, data: Bytes::from(data) })
    }

    fn format_quote_result(&self, request: &QuoteRequest, raw: &[u8]) -> Result<QuoteResult> {
        let (amount_in, amount_out) = match request.swap_type {
            SwapType::ExactOut => {
                let ret = IQuoterV2::quoteExactOutputCall::abi_decode_returns(raw)?;
                (ret.amountIn, request.amount)
            }
            _ => {
                let ret = IQuoterV2::quoteExactInputCall::abi_decode_returns(raw)?;
                (request.amount, ret.amountOut)
            }
        };

        Ok(QuoteResult {
            swap_type: request.swap_type,
            amount_in,
            amount_out,
            route: request.route.clone(),
            price_impact: None,
        })
    }

    fn swap_calldata(
        &self,
        chain: &ChainConfig,
        quote: &QuoteResult,
        recipient: Address,
        slippage_bps: u32,
        deadline: U256,
    ) -> Result<Bytes> {
        let route = &quote.route;
        // Native output is delivered to the router, then unwrapped to the recipient.
        let swap_recipient = if route.is_to_native { chain.v3_router } else { recipient };

        let (swap, min_unwrap) = match quote.swap_type {
            SwapType::ExactIn => {
                let min_out = quote.min_amount_out(slippage_bps);
                let call = ISwapRouter::exactInputCall {
                    params: ISwapRouter::ExactInputParams {
                        path: route_path(route, false)?,
                        recipient: swap_recipient,
                        deadline,
                        amountIn: quote.amount_in,
                        amountOutMinimum: min_out,
                    },
                };
                (call.abi_encode(), min_out)
            }
            SwapType::ExactOut => {
                let call = ISwapRouter::exactOutputCall {
                    params: ISwapRouter::ExactOutputParams {
                        path: route_path(route, true)?,
                        recipient: swap_recipient,
                        deadline,
                        amountOut: quote.amount_out,
                        amountInMaximum: quote.max_amount_in(slippage_bps),
                    },
                };
                (call.abi_encode(), quote.amount_out)
            }
            SwapType::Wrap | SwapType::Unwrap => {
                return Err(AppError::OperationConstruction(
                    "wrap quotes have no router calldata".into(),
                ))
            }
        };

        let mut calls = vec![Bytes::from(swap)];
        if route.is_to_native {
            calls.push(Bytes::from(
                ISwapRouter::unwrapWETH9Call { amountMinimum: min_unwrap, recipient }.abi_encode(),
            ));
        }
        if route.is_from_native && quote.swap_type == SwapType::ExactOut {
            calls.push(Bytes::from(ISwapRouter::refundETHCall {}.abi_encode()));
        }

        if calls.len() == 1 {
            return Ok(calls.remove(0));
        }
        Ok(Bytes::from(ISwapRouter::multicallCall { data: calls }.abi_encode()))
    }
}
