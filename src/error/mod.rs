//! Error types and handling module.
//!
//! Defines all application-specific error types and conversions.

use alloy::primitives::Address;
use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ethereum RPC errors.
    #[error("Ethereum RPC error: {0}")]
    Rpc(String),

    /// Transport errors.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid Ethereum address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Token is not registered in the directory for the chain.
    #[error("Token not found: {0}")]
    TokenNotFound(Address),

    /// Source and destination resolve to the same token.
    #[error("From and to tokens are the same: {0}")]
    IdenticalTokens(Address),

    /// A designated token (native, wrapped native, gateway) could not be resolved.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No adapter is registered for the requested exchange.
    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),

    /// The settlement contract refused to build the user operation.
    #[error("Operation construction failed: {0}")]
    OperationConstruction(String),

    /// The signature is malformed or does not recover to the expected signer.
    #[error("Signature validation failed for {expected}: {reason}")]
    SignatureValidation { expected: Address, reason: String },

    /// No configuration (or no settlement contracts) for the chain.
    #[error("Chain not configured: {0}")]
    ChainNotConfigured(u64),

    /// Token approval step failed.
    #[error("approve failed: {0}")]
    ApproveFailed(String),

    /// Swap submission step failed.
    #[error("swap failed: {0}")]
    SwapFailed(String),

    /// A signing-flow action was triggered from the wrong step.
    #[error("Invalid transition: {action} is not allowed in step {step}")]
    InvalidTransition { action: &'static str, step: &'static str },

    /// Wallet-related errors.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<alloy::transports::TransportError> for AppError {
    fn from(err: alloy::transports::TransportError) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<alloy::contract::Error> for AppError {
    fn from(err: alloy::contract::Error) -> Self {
        AppError::Rpc(err.to_string())
    }
}

impl From<alloy::signers::Error> for AppError {
    fn from(err: alloy::signers::Error) -> Self {
        AppError::Wallet(err.to_string())
    }
}

impl From<alloy::signers::local::LocalSignerError> for AppError {
    fn from(err: alloy::signers::local::LocalSignerError) -> Self {
        AppError::Wallet(err.to_string())
    }
}

impl From<alloy::sol_types::Error> for AppError {
    fn from(err: alloy::sol_types::Error) -> Self {
        AppError::Parse(format!("ABI decode failed: {err}"))
    }
}

impl From<alloy::hex::FromHexError> for AppError {
    fn from(err: alloy::hex::FromHexError) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidAddress(_)
            | AppError::TokenNotFound(_)
            | AppError::IdenticalTokens(_)
            | AppError::Parse(_) => McpError::invalid_params(err.to_string(), None),
            AppError::Config(_)
            | AppError::NotFound(_)
            | AppError::ChainNotConfigured(_)
            | AppError::UnsupportedExchange(_) => McpError::invalid_request(err.to_string(), None),
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_app_error_config_display() {
        let err = AppError::Config("Missing RPC URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: Missing RPC URL");
    }

    #[test]
    fn test_app_error_token_not_found_display() {
        let addr = address!("0000000000000000000000000000000000000001");
        let err = AppError::TokenNotFound(addr);
        assert!(err.to_string().contains("Token not found"));
    }

    #[test]
    fn test_app_error_identical_tokens_display() {
        let addr = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");
        let err = AppError::IdenticalTokens(addr);
        assert!(err.to_string().starts_with("From and to tokens are the same"));
    }

    #[test]
    fn test_app_error_step_failures_display() {
        let err = AppError::ApproveFailed("user rejected".to_string());
        assert!(err.to_string().starts_with("approve failed"));

        let err = AppError::SwapFailed("reverted".to_string());
        assert!(err.to_string().starts_with("swap failed"));
    }

    #[test]
    fn test_app_error_signature_validation_display() {
        let expected = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let err = AppError::SignatureValidation { expected, reason: "malformed".to_string() };
        let msg = err.to_string();
        assert!(msg.contains("Signature validation failed"));
        assert!(msg.ends_with(": malformed"));
        assert!(msg.to_lowercase().contains("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"));
    }

    #[test]
    fn test_app_error_invalid_transition_display() {
        let err = AppError::InvalidTransition { action: "swap", step: "approve" };
        assert_eq!(err.to_string(), "Invalid transition: swap is not allowed in step approve");
    }

    #[test]
    fn test_app_error_chain_not_configured_display() {
        let err = AppError::ChainNotConfigured(10);
        assert_eq!(err.to_string(), "Chain not configured: 10");
    }

    #[test]
    fn test_app_error_to_mcp_error_invalid_params() {
        let err = AppError::InvalidAddress("bad address".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);

        let addr = address!("0000000000000000000000000000000000000001");
        let mcp_err: McpError = AppError::TokenNotFound(addr).into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);

        let mcp_err: McpError = AppError::IdenticalTokens(addr).into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_app_error_to_mcp_error_invalid_request() {
        let mcp_err: McpError = AppError::Config("config error".to_string()).into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_REQUEST);

        let mcp_err: McpError = AppError::ChainNotConfigured(5).into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_REQUEST);

        let mcp_err: McpError = AppError::NotFound("No token found for 'FOO'".to_string()).into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn test_app_error_to_mcp_error_internal_error() {
        let mcp_err: McpError = AppError::Rpc("rpc failed".to_string()).into();
        assert_eq!(mcp_err.code, ErrorCode::INTERNAL_ERROR);

        let mcp_err: McpError = AppError::OperationConstruction("reverted".to_string()).into();
        assert_eq!(mcp_err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn test_mcp_error_message_preserved() {
        let err = AppError::Rpc("Connection refused".to_string());
        let mcp_err: McpError = err.into();
        assert!(mcp_err.message.contains("Connection refused"));
        assert!(mcp_err.data.is_none());
    }
}
