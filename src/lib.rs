//! Atlas Swap MCP Server Library
//!
//! A Model Context Protocol server that routes, quotes and builds token swaps
//! settled through Atlas user operations.
//!
//! # Features
//!
//! - **Token Directory**: Per-chain token list with native, wrapped native and
//!   gateway tokens, loaded once and cached
//! - **Routing**: Direct and two-hop routes over Uniswap V2 and V3 style venues
//! - **Quoting**: Concurrent route quotes with best-quote selection and price impact
//! - **Settlement**: Baseline calls and Atlas user operations, signed and validated
//!   with EIP-712
//!
//! # Example
//!
//! ```rust,ignore
//! use atlas_swap_mcp::{AtlasSwapServer, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = AtlasSwapServer::new(config)?;
//!     // Run server...
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ethereum;
pub mod exchanges;
pub mod mcp;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use ethereum::constants::*;
pub use mcp::AtlasSwapServer;
