//! Wrapped native token (WETH9-style) bindings.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IWrappedNative {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}
