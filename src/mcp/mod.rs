//! MCP server module.
//!
//! Contains the MCP server implementation with tool handlers.

pub mod server;

pub use server::AtlasSwapServer;
pub use server::{BuildSwapInput, GetSwapQuoteInput, GetSwapRoutesInput};
