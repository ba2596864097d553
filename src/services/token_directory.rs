//! Token directory with per-chain memoized loading.
//!
//! Tokens for a chain are loaded once from a [`TokenSource`] and cached
//! until [`TokenDirectory::refresh`] is called. Concurrent first loads for
//! the same chain share a single in-flight load.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};

use crate::{
    config::{ChainConfig, ChainRegistry},
    error::{AppError, Result},
    types::Token,
};

// ============================================================================
// Token Sources
// ============================================================================

/// Where a chain's token list comes from.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Load every token known for `chain`.
    async fn load(&self, chain: &ChainConfig) -> Result<Vec<Token>>;
}

/// Token entry as published in a tokenlists.org list.
#[derive(Debug, Clone, Deserialize)]
struct TokenListToken {
    #[serde(rename = "chainId")]
    chain_id: u64,
    address: String,
    symbol: String,
    name: String,
    decimals: u8,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenListResponse {
    tokens: Vec<TokenListToken>,
}

/// Remote token list. The chain's native asset is added to every load.
pub struct TokenListSource {
    client: reqwest::Client,
    url: String,
}

impl TokenListSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl TokenSource for TokenListSource {
    async fn load(&self, chain: &ChainConfig) -> Result<Vec<Token>> {
        info!(url = %self.url, chain_id = chain.chain_id, "Fetching token list");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to fetch token list: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Token list API returned status: {}",
                response.status()
            )));
        }

        let list: TokenListResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse token list: {}", e)))?;

        let mut tokens = vec![chain.native_token()];
        for entry in list.tokens.into_iter().filter(|t| t.chain_id == chain.chain_id) {
            let address = match entry.address.parse::<Address>() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!("Invalid token address {}: {}", entry.address, e);
                    continue;
                }
            };

            tokens.push(Token {
                chain_id: entry.chain_id,
                address,
                decimals: entry.decimals,
                symbol: entry.symbol,
                name: entry.name,
                logo_uri: entry.logo_uri,
                tags: entry.tags,
            });
        }

        Ok(tokens)
    }
}

/// Fixed in-memory token list.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenSource {
    tokens: Vec<Token>,
}

impl StaticTokenSource {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn load(&self, chain: &ChainConfig) -> Result<Vec<Token>> {
        Ok(self.tokens.iter().filter(|t| t.chain_id == chain.chain_id).cloned().collect())
    }
}

// ============================================================================
// Chain Tokens
// ============================================================================

/// Loaded tokens of one chain plus its designated routing tokens.
#[derive(Debug, Clone)]
pub struct ChainTokens {
    by_address: HashMap<Address, Token>,
    /// Uppercase symbol to address. The first token listed wins.
    by_symbol: HashMap<String, Address>,
    native: Token,
    wrapped_native: Token,
    gateway: Token,
}

impl ChainTokens {
    /// Index `tokens` and resolve the native, wrapped native and gateway tokens.
    pub fn new(chain: &ChainConfig, tokens: Vec<Token>) -> Result<Self> {
        let mut by_address = HashMap::with_capacity(tokens.len());
        let mut by_symbol = HashMap::with_capacity(tokens.len());

        for token in tokens.into_iter().filter(|t| t.chain_id == chain.chain_id) {
            by_symbol.entry(token.symbol.to_uppercase()).or_insert(token.address);
            by_address.entry(token.address).or_insert(token);
        }

        let designated = |address: Address, role: &str| {
            by_address.get(&address).cloned().ok_or_else(|| {
                AppError::NotFound(format!("{} token not found for chain ID {}", role, chain.chain_id))
            })
        };

        let native = designated(chain.native_token().address, "Native")?;
        let wrapped_native = designated(chain.wrapped_native, "Wrapped native")?;
        let gateway = designated(chain.gateway, "Gateway")?;

        Ok(Self { by_address, by_symbol, native, wrapped_native, gateway })
    }

    pub fn get(&self, address: Address) -> Option<&Token> {
        self.by_address.get(&address)
    }

    pub fn contains(&self, address: Address) -> bool {
        self.by_address.contains_key(&address)
    }

    /// Case-insensitive symbol lookup.
    pub fn by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.by_symbol.get(&symbol.trim().to_uppercase()).and_then(|a| self.by_address.get(a))
    }

    pub fn native(&self) -> &Token {
        &self.native
    }

    pub fn wrapped_native(&self) -> &Token {
        &self.wrapped_native
    }

    pub fn gateway(&self) -> &Token {
        &self.gateway
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}

// ============================================================================
// Token Directory
// ============================================================================

type ChainSlot = Arc<OnceCell<Arc<ChainTokens>>>;

/// Per-chain token cache in front of a [`TokenSource`].
pub struct TokenDirectory {
    source: Arc<dyn TokenSource>,
    chains: Arc<ChainRegistry>,
    slots: RwLock<HashMap<u64, ChainSlot>>,
}

impl TokenDirectory {
    pub fn new(source: Arc<dyn TokenSource>, chains: Arc<ChainRegistry>) -> Self {
        Self { source, chains, slots: RwLock::new(HashMap::new()) }
    }

    /// Tokens for `chain_id`, loading them on first use.
    ///
    /// A failed load leaves the chain unloaded so the next call retries.
    pub async fn tokens(&self, chain_id: u64) -> Result<Arc<ChainTokens>> {
        let slot = self.slot(chain_id).await;
        slot.get_or_try_init(|| self.load(chain_id)).await.cloned()
    }

    /// Reload a chain's tokens, replacing the cached set.
    pub async fn refresh(&self, chain_id: u64) -> Result<Arc<ChainTokens>> {
        let tokens = self.load(chain_id).await?;
        let slot = Arc::new(OnceCell::new_with(Some(tokens.clone())));
        self.slots.write().await.insert(chain_id, slot);
        Ok(tokens)
    }

    /// Resolve a token by address or symbol.
    pub async fn resolve(&self, chain_id: u64, query: &str) -> Result<Token> {
        let tokens = self.tokens(chain_id).await?;
        let query = query.trim();

        if query.starts_with("0x") || query.starts_with("0X") {
            let address = query
                .parse::<Address>()
                .map_err(|e| AppError::InvalidAddress(format!("{}: {}", query, e)))?;
            return tokens.get(address).cloned().ok_or(AppError::TokenNotFound(address));
        }

        tokens.by_symbol(query).cloned().ok_or_else(|| {
            AppError::NotFound(format!("Unknown token symbol '{}' on chain {}", query, chain_id))
        })
    }

    async fn slot(&self, chain_id: u64) -> ChainSlot {
        if let Some(slot) = self.slots.read().await.get(&chain_id) {
            return slot.clone();
        }
        self.slots.write().await.entry(chain_id).or_default().clone()
    }

    async fn load(&self, chain_id: u64) -> Result<Arc<ChainTokens>> {
        let chain = self.chains.get(chain_id)?;
        let tokens = self.source.load(chain).await?;
        let loaded = ChainTokens::new(chain, tokens)?;

        info!(chain_id, count = loaded.len(), "Loaded token directory");
        Ok(Arc::new(loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::constants::{POLYGON_USDC_ADDRESS, WMATIC_ADDRESS};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn polygon_tokens() -> Vec<Token> {
        let chain = ChainConfig::polygon();
        vec![
            chain.native_token(),
            Token::new(137, WMATIC_ADDRESS, 18, "WMATIC", "Wrapped Matic"),
            Token::new(137, POLYGON_USDC_ADDRESS, 6, "USDC", "USD Coin (PoS)"),
        ]
    }

    /// Counts loads and yields once so concurrent callers overlap.
    struct CountingSource {
        inner: StaticTokenSource,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn load(&self, chain: &ChainConfig) -> Result<Vec<Token>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.inner.load(chain).await
        }
    }

    fn counting_directory(tokens: Vec<Token>) -> (Arc<CountingSource>, TokenDirectory) {
        let source = Arc::new(CountingSource {
            inner: StaticTokenSource::new(tokens),
            loads: AtomicUsize::new(0),
        });
        let directory = TokenDirectory::new(source.clone(), Arc::new(ChainRegistry::builtin()));
        (source, directory)
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_coalesce() {
        let (source, directory) = counting_directory(polygon_tokens());

        let (a, b, c) =
            tokio::join!(directory.tokens(137), directory.tokens(137), directory.tokens(137));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        directory.tokens(137).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_reloads() {
        let (source, directory) = counting_directory(polygon_tokens());

        directory.tokens(137).await.unwrap();
        directory.refresh(137).await.unwrap();
        directory.tokens(137).await.unwrap();
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_gateway_is_not_found_and_retried() {
        let tokens: Vec<Token> =
            polygon_tokens().into_iter().filter(|t| t.address != POLYGON_USDC_ADDRESS).collect();
        let (source, directory) = counting_directory(tokens);

        match directory.tokens(137).await {
            Err(AppError::NotFound(msg)) => assert!(msg.contains("Gateway")),
            other => panic!("Expected NotFound, got {:?}", other.map(|t| t.len())),
        }
        assert!(directory.tokens(137).await.is_err());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        let (_, directory) = counting_directory(polygon_tokens());
        assert!(matches!(directory.tokens(10).await, Err(AppError::ChainNotConfigured(10))));
    }

    #[tokio::test]
    async fn test_resolve_by_symbol_and_address() {
        let (_, directory) = counting_directory(polygon_tokens());

        let usdc = directory.resolve(137, "usdc").await.unwrap();
        assert_eq!(usdc.address, POLYGON_USDC_ADDRESS);

        let wmatic =
            directory.resolve(137, "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270").await.unwrap();
        assert_eq!(wmatic.symbol, "WMATIC");

        let native = directory.resolve(137, "POL").await.unwrap();
        assert!(native.is_native());

        assert!(matches!(
            directory.resolve(137, "0x1111111111111111111111111111111111111111").await,
            Err(AppError::TokenNotFound(_))
        ));
        assert!(matches!(directory.resolve(137, "NOPE").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            directory.resolve(137, "0x12").await,
            Err(AppError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_chain_tokens_ignore_other_chains_and_keep_first_symbol() {
        let mut tokens = polygon_tokens();
        tokens.push(Token::new(
            1,
            alloy::primitives::address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            6,
            "USDC",
            "USD Coin",
        ));
        tokens.push(Token::new(
            137,
            alloy::primitives::address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
            6,
            "USDC",
            "USD Coin",
        ));

        let chain_tokens = ChainTokens::new(&ChainConfig::polygon(), tokens).unwrap();
        assert_eq!(chain_tokens.len(), 4);
        assert_eq!(chain_tokens.by_symbol("USDC").unwrap().address, POLYGON_USDC_ADDRESS);
        assert_eq!(chain_tokens.wrapped_native().address, WMATIC_ADDRESS);
        assert_eq!(chain_tokens.gateway().address, POLYGON_USDC_ADDRESS);
    }

    #[test]
    fn test_token_list_parsing() {
        let json = r#"{"name":"Test","tokens":[
            {"chainId":137,"address":"0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270","symbol":"WMATIC","name":"Wrapped Matic","decimals":18,"logoURI":null},
            {"chainId":1,"address":"0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2","symbol":"WETH","name":"Wrapped Ether","decimals":18}
        ]}"#;
        let list: TokenListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.tokens.len(), 2);
        assert_eq!(list.tokens[0].chain_id, 137);
        assert!(list.tokens[1].logo_uri.is_none());
    }
}
