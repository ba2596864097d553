//! Common utilities for integration tests.

use atlas_swap_mcp::{AtlasSwapServer, Config};

/// Hardhat's first development key; never holds funds.
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Helper to create a test server from environment variables.
pub fn create_test_server() -> Option<AtlasSwapServer> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Check if required environment variables are set
    let rpc_url = std::env::var("ETHEREUM_RPC_URL").ok()?;
    let private_key = std::env::var("ETHEREUM_PRIVATE_KEY").ok()?;

    if rpc_url.is_empty() || private_key.is_empty() {
        return None;
    }

    let mut config = Config::from_env().ok()?;
    config.log_level = "warn".to_string();

    AtlasSwapServer::new(config).ok()
}

/// Skip test if server cannot be created (missing env vars).
#[macro_export]
macro_rules! skip_if_no_server {
    () => {
        match common::create_test_server() {
            Some(server) => server,
            None => {
                eprintln!("Skipping test: ETHEREUM_RPC_URL or ETHEREUM_PRIVATE_KEY not set");
                return;
            }
        }
    };
}
