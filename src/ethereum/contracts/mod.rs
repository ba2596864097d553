//! Smart contract bindings.

pub mod atlas;
pub mod erc20;
pub mod uniswap_v2;
pub mod uniswap_v3;
pub mod weth;
