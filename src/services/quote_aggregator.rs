//! Best-quote selection across candidate routes.

use std::sync::Arc;

use alloy::primitives::U256;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    config::ChainRegistry,
    ethereum::ChainReader,
    exchanges::ExchangeRegistry,
    types::{QuoteRequest, QuoteResult, SwapDirection, SwapRoute},
};

/// Quotes every candidate route concurrently and keeps the best one.
#[derive(Clone)]
pub struct QuoteAggregator {
    reader: Arc<dyn ChainReader>,
    exchanges: ExchangeRegistry,
    chains: Arc<ChainRegistry>,
}

impl QuoteAggregator {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        exchanges: ExchangeRegistry,
        chains: Arc<ChainRegistry>,
    ) -> Self {
        Self { reader, exchanges, chains }
    }

    /// Best quote for `amount` over `routes`.
    ///
    /// Exact-in maximizes the output, exact-out minimizes the input. Routes
    /// that fail to quote are skipped; `None` means no route could be quoted.
    pub async fn get_best_quote(
        &self,
        amount: U256,
        routes: &[SwapRoute],
        direction: SwapDirection,
    ) -> Option<QuoteResult> {
        let tasks = routes.iter().map(|route| self.quote_route(amount, route, direction));
        let quotes = join_all(tasks).await;

        let quoted = quotes.iter().filter(|q| q.is_some()).count();
        let best = select_best(quotes, direction);

        match &best {
            Some(quote) => info!(
                candidates = routes.len(),
                quoted,
                amount_in = %quote.amount_in,
                amount_out = %quote.amount_out,
                path = ?quote.route.path(),
                "Selected best quote"
            ),
            None => info!(candidates = routes.len(), "No route could be quoted"),
        }

        best
    }

    async fn quote_route(
        &self,
        amount: U256,
        route: &SwapRoute,
        direction: SwapDirection,
    ) -> Option<QuoteResult> {
        let adapter = match self.exchanges.get(route.exchange) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(error = %e, "Skipping route");
                return None;
            }
        };
        let chain = match self.chains.get(route.chain_id) {
            Ok(chain) => chain,
            Err(e) => {
                warn!(error = %e, "Skipping route");
                return None;
            }
        };

        let request = QuoteRequest { swap_type: direction.into(), amount, route: route.clone() };
        let quote = adapter.get_quote(self.reader.as_ref(), chain, &request).await;

        if quote.is_none() {
            debug!(path = ?route.path(), "Route excluded from aggregation");
        }
        quote
    }
}

/// Pick the optimal quote. The earliest route wins ties.
pub fn select_best(
    quotes: impl IntoIterator<Item = Option<QuoteResult>>,
    direction: SwapDirection,
) -> Option<QuoteResult> {
    quotes.into_iter().flatten().fold(None, |best: Option<QuoteResult>, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = match direction {
                SwapDirection::ExactIn => candidate.amount_out > current.amount_out,
                SwapDirection::ExactOut => candidate.amount_in < current.amount_in,
            };
            Some(if better { candidate } else { current })
        }
    })
}
