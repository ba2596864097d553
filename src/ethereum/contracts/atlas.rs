//! Atlas settlement contract bindings.
//!
//! `IFastLaneOnline` is the dapp control contract that turns a swap intent
//! into a canonical user operation. `IAtlas` resolves the per-user execution
//! environment that receives the baseline swap output.

use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug, PartialEq, Eq)]
    interface IFastLaneOnline {
        struct SwapIntent {
            address tokenUserBuys;
            uint256 minAmountUserBuys;
            address tokenUserSells;
            uint256 amountUserSells;
        }

        struct BaselineCall {
            address to;
            bytes data;
            uint256 value;
        }

        struct UserOperation {
            address from;
            address to;
            uint256 value;
            uint256 gas;
            uint256 maxFeePerGas;
            uint256 nonce;
            uint256 deadline;
            address dapp;
            address control;
            uint32 callConfig;
            address sessionKey;
            bytes data;
            bytes signature;
        }

        function getUserOperation(
            address swapper,
            SwapIntent calldata swapIntent,
            BaselineCall calldata baselineCall,
            uint256 deadline,
            uint256 gas,
            uint256 maxFeePerGas,
            uint256 msgValue
        ) external view returns (UserOperation memory userOp);
    }
}

sol! {
    #[sol(rpc)]
    interface IAtlas {
        function getExecutionEnvironment(address user, address control)
            external
            view
            returns (address executionEnvironment, uint32 callConfig, bool exists);
    }
}

/// EIP-712 typed-data view of a user operation.
///
/// The calldata is committed to by hash and the signature is not part of the
/// signed payload, matching the verification contract's type string.
pub mod typed {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct UserOperation {
            address from;
            address to;
            uint256 value;
            uint256 gas;
            uint256 maxFeePerGas;
            uint256 nonce;
            uint256 deadline;
            address dapp;
            address control;
            uint32 callConfig;
            address sessionKey;
            bytes32 data;
        }
    }
}
