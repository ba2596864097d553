//! Uniswap V3 contract bindings.

use alloy::sol;

/// Common fee tiers in Uniswap V3 (in basis points * 100).
pub mod fee_tiers {
    /// 0.01% fee tier.
    pub const FEE_LOWEST: u32 = 100;
    /// 0.05% fee tier.
    pub const FEE_LOW: u32 = 500;
    /// 0.30% fee tier.
    pub const FEE_MEDIUM: u32 = 3000;
    /// 1.00% fee tier.
    pub const FEE_HIGH: u32 = 10000;

    /// All available fee tiers.
    pub const ALL_FEES: [u32; 4] = [FEE_LOWEST, FEE_LOW, FEE_MEDIUM, FEE_HIGH];
}

// Uniswap V3 SwapRouter interface
sol! {
    #[sol(rpc)]
    interface ISwapRouter {
        struct ExactInputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
        }

        struct ExactOutputParams {
            bytes path;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
        }

        function exactInput(ExactInputParams calldata params) external payable returns (uint256 amountOut);
        function exactOutput(ExactOutputParams calldata params) external payable returns (uint256 amountIn);
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
        function refundETH() external payable;
    }
}

// Uniswap V3 Quoter V2 interface
sol! {
    #[sol(rpc)]
    interface IQuoterV2 {
        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );

        function quoteExactOutput(bytes memory path, uint256 amountOut)
            external
            returns (
                uint256 amountIn,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }
}
