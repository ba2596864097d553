//! Swap route discovery.
//!
//! Routes are the direct hops between two tokens, then two-hop routes through
//! the wrapped native token and through the chain's gateway token.

use std::sync::Arc;

use alloy::primitives::Address;

use crate::{
    error::{AppError, Result},
    exchanges::{ExchangeAdapter, ExchangeRegistry},
    services::token_directory::TokenDirectory,
    types::{Exchange, SwapRoute, SwapStep},
};

/// Tokens a route search runs between, after native substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEndpoints {
    pub from: Address,
    pub to: Address,
    pub is_from_native: bool,
    pub is_to_native: bool,
}

/// Enumerates candidate routes for a token pair.
#[derive(Clone)]
pub struct RouteBuilder {
    directory: Arc<TokenDirectory>,
    exchanges: ExchangeRegistry,
}

impl RouteBuilder {
    pub fn new(directory: Arc<TokenDirectory>, exchanges: ExchangeRegistry) -> Self {
        Self { directory, exchanges }
    }

    /// All admissible routes from `from` to `to`. An empty result means no path.
    pub async fn get_swap_routes(
        &self,
        from: Address,
        to: Address,
        chain_id: u64,
        exchange: Exchange,
    ) -> Result<Vec<SwapRoute>> {
        let tokens = self.directory.tokens(chain_id).await?;
        let wrapped = tokens.wrapped_native().address;
        let native = tokens.native().address;

        let endpoints = RouteEndpoints {
            from: if from == native { wrapped } else { from },
            to: if to == native { wrapped } else { to },
            is_from_native: from == native,
            is_to_native: to == native,
        };

        if !tokens.contains(endpoints.from) {
            return Err(AppError::TokenNotFound(endpoints.from));
        }
        if !tokens.contains(endpoints.to) {
            return Err(AppError::TokenNotFound(endpoints.to));
        }
        if endpoints.from == endpoints.to {
            return Err(AppError::IdenticalTokens(endpoints.from));
        }

        let adapter = self.exchanges.get(exchange)?;
        let routes = build_routes(
            adapter.as_ref(),
            chain_id,
            endpoints,
            wrapped,
            tokens.gateway().address,
        );

        tracing::debug!(
            from = %endpoints.from,
            to = %endpoints.to,
            exchange = %exchange,
            count = routes.len(),
            "Built swap routes"
        );

        Ok(routes)
    }
}

/// Enumerate routes for already normalized endpoints.
///
/// Two-hop routes through the wrapped native token are added when neither
/// endpoint is the wrapped native token; gateway routes additionally require
/// that neither endpoint is the gateway. Coinciding routes are kept.
pub fn build_routes(
    adapter: &dyn ExchangeAdapter,
    chain_id: u64,
    endpoints: RouteEndpoints,
    wrapped_native: Address,
    gateway: Address,
) -> Vec<SwapRoute> {
    let RouteEndpoints { from, to, .. } = endpoints;
    let route = |steps: Vec<SwapStep>| SwapRoute {
        chain_id,
        exchange: adapter.exchange(),
        steps,
        is_from_native: endpoints.is_from_native,
        is_to_native: endpoints.is_to_native,
    };

    let mut routes: Vec<SwapRoute> =
        adapter.build_swap_steps(from, to).into_iter().map(|step| route(vec![step])).collect();

    if from != wrapped_native && to != wrapped_native {
        routes.extend(
            combine_steps(
                &adapter.build_swap_steps(from, wrapped_native),
                &adapter.build_swap_steps(wrapped_native, to),
            )
            .map(&route),
        );

        if from != gateway && to != gateway {
            routes.extend(
                combine_steps(
                    &adapter.build_swap_steps(from, gateway),
                    &adapter.build_swap_steps(gateway, to),
                )
                .map(&route),
            );
        }
    }

    routes
}

/// Every pairing of a first step with a second step.
fn combine_steps<'a>(
    first: &'a [SwapStep],
    second: &'a [SwapStep],
) -> impl Iterator<Item = Vec<SwapStep>> + 'a {
    first.iter().flat_map(move |a| second.iter().map(move |b| vec![*a, *b]))
}
