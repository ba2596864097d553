//! Ethereum RPC client.

use alloy::{
    network::Ethereum,
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};

/// Type alias for the HTTP provider.
pub type HttpProvider = RootProvider<Ethereum>;

/// Read-only chain access needed by the routing and operation pipeline.
///
/// Implemented by [`EthereumClient`]; tests substitute canned responses.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Execute an `eth_call` against `to` with the given calldata.
    async fn call_contract(&self, to: Address, data: Bytes, value: Option<U256>) -> Result<Bytes>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64>;

    /// Current EIP-1559 max fee per gas estimate, in wei.
    async fn max_fee_per_gas(&self) -> Result<u128>;
}

/// Ethereum RPC client wrapper with lazy initialization.
#[derive(Clone)]
pub struct EthereumClient {
    /// The underlying provider.
    provider: Arc<HttpProvider>,
    /// RPC URL for logging.
    rpc_url: String,
    /// Lazily initialized chain ID.
    chain_id: Arc<OnceCell<u64>>,
}

impl EthereumClient {
    /// Create a new Ethereum client.
    ///
    /// Note: This does NOT make any network calls. The connection is
    /// established lazily when the first operation is performed.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = rpc_url
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid RPC URL: {}", rpc_url)))?;

        #[allow(deprecated)]
        let provider = ProviderBuilder::new().connect_http(url).root().clone();

        tracing::info!(rpc_url = %rpc_url, "Ethereum client created (lazy initialization)");

        Ok(Self {
            provider: Arc::new(provider),
            rpc_url: rpc_url.to_string(),
            chain_id: Arc::new(OnceCell::new()),
        })
    }

    /// Get the chain ID (fetches from network on first call).
    pub async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let chain_id = self.provider.get_chain_id().await?;
                tracing::info!(chain_id = chain_id, rpc_url = %self.rpc_url, "Connected to Ethereum node");
                Ok(chain_id)
            })
            .await
            .copied()
    }

    /// Execute a call (simulate transaction without broadcasting).
    pub async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        let result = self.provider.call(tx.clone()).await?;
        Ok(result)
    }
}

#[async_trait]
impl ChainReader for EthereumClient {
    async fn call_contract(&self, to: Address, data: Bytes, value: Option<U256>) -> Result<Bytes> {
        let mut tx = TransactionRequest::default().to(to).input(data.into());

        if let Some(v) = value {
            tx = tx.value(v);
        }

        self.call(&tx).await
    }

    async fn block_number(&self) -> Result<u64> {
        let number = self.provider.get_block_number().await?;
        Ok(number)
    }

    async fn max_fee_per_gas(&self) -> Result<u128> {
        let estimate = self.provider.estimate_eip1559_fees().await?;
        Ok(estimate.max_fee_per_gas)
    }
}
