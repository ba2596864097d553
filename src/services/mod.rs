//! Business logic services module.

pub mod operation_builder;
pub mod quote_aggregator;
pub mod route_builder;
pub mod signing;
pub mod swap;
pub mod token_directory;

pub use operation_builder::{AtlasSettlement, OperationBuilder, SettlementContract};
pub use quote_aggregator::QuoteAggregator;
pub use route_builder::RouteBuilder;
pub use signing::{AllowanceManager, ApprovalRequest, ProcessStep, SwapProcess, SwapSubmitter};
pub use swap::{PreparedSwap, PriceImpactLevel, SwapQuote, SwapService, SwapSettings};
pub use token_directory::{StaticTokenSource, TokenDirectory, TokenListSource, TokenSource};
