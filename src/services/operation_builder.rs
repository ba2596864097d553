//! Baseline call and Atlas user operation construction.

use std::sync::Arc;
use std::time::SystemTime;

use alloy::{
    primitives::{Address, Bytes, U256},
    sol_types::SolCall,
};
use async_trait::async_trait;

use crate::{
    config::{ChainRegistry, SettlementContracts},
    error::{AppError, Result},
    ethereum::{
        constants::{
            ATLAS_GAS_SURCHARGE_BPS, BPS_DENOMINATOR, SOLVER_GAS_ESTIMATE, SWAP_GAS_ESTIMATE,
            WRAP_GAS_ESTIMATE,
        },
        contracts::{
            atlas::{IAtlas, IFastLaneOnline},
            weth::IWrappedNative,
        },
        ChainReader,
    },
    exchanges::ExchangeRegistry,
    types::{BaselineCall, QuoteResult, SwapCallData, SwapIntent, SwapType, UserOperation},
};

/// Get current Unix timestamp in seconds.
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
fn current_timestamp() -> u64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Block number `minutes` from `current_block` at the given block time.
///
/// Always at least one block ahead.
pub fn deadline_block(current_block: u64, minutes: u64, block_time_ms: u64) -> u64 {
    let window_ms = minutes.saturating_mul(60_000);
    let blocks = window_ms.div_ceil(block_time_ms.max(1)).max(1);
    current_block.saturating_add(blocks)
}

/// Atlas surcharge on the maximum gas cost of an operation.
pub fn gas_surcharge(gas: u64, max_fee_per_gas: U256) -> U256 {
    let max_cost = U256::from(gas).saturating_mul(max_fee_per_gas);
    max_cost.saturating_mul(U256::from(ATLAS_GAS_SURCHARGE_BPS)) / U256::from(BPS_DENOMINATOR)
}

// ============================================================================
// Settlement Contract
// ============================================================================

/// Read-only view of the Atlas settlement contracts.
#[async_trait]
pub trait SettlementContract: Send + Sync {
    /// Canonical user operation for an intent, built by the dapp control.
    #[allow(clippy::too_many_arguments)]
    async fn get_user_operation(
        &self,
        contracts: &SettlementContracts,
        swapper: Address,
        intent: &SwapIntent,
        baseline_call: &BaselineCall,
        deadline: u64,
        gas: u64,
        max_fee_per_gas: U256,
    ) -> Result<UserOperation>;

    /// The user's execution environment for the dapp control.
    async fn get_execution_environment(
        &self,
        contracts: &SettlementContracts,
        user: Address,
    ) -> Result<Address>;
}

/// [`SettlementContract`] over `eth_call`.
#[derive(Clone)]
pub struct AtlasSettlement {
    reader: Arc<dyn ChainReader>,
}

impl AtlasSettlement {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl SettlementContract for AtlasSettlement {
    async fn get_user_operation(
        &self,
        contracts: &SettlementContracts,
        swapper: Address,
        intent: &SwapIntent,
        baseline_call: &BaselineCall,
        deadline: u64,
        gas: u64,
        max_fee_per_gas: U256,
    ) -> Result<UserOperation> {
        let call = IFastLaneOnline::getUserOperationCall {
            swapper,
            swapIntent: intent.to_abi(),
            baselineCall: baseline_call.to_abi(),
            deadline: U256::from(deadline),
            gas: U256::from(gas),
            maxFeePerGas: max_fee_per_gas,
            msgValue: baseline_call.value,
        };

        let raw = self
            .reader
            .call_contract(contracts.dapp_control, Bytes::from(call.abi_encode()), None)
            .await
            .map_err(|e| AppError::OperationConstruction(e.to_string()))?;

        let operation =
            IFastLaneOnline::getUserOperationCall::abi_decode_returns(&raw).map_err(|e| {
                AppError::OperationConstruction(format!("invalid user operation: {}", e))
            })?;

        Ok(UserOperation::from_abi(operation))
    }

    async fn get_execution_environment(
        &self,
        contracts: &SettlementContracts,
        user: Address,
    ) -> Result<Address> {
        let call = IAtlas::getExecutionEnvironmentCall { user, control: contracts.dapp_control };
        let raw = self
            .reader
            .call_contract(contracts.atlas, Bytes::from(call.abi_encode()), None)
            .await?;
        let ret = IAtlas::getExecutionEnvironmentCall::abi_decode_returns(&raw)?;
        Ok(ret.executionEnvironment)
    }
}

// ============================================================================
// Operation Builder
// ============================================================================

/// Turns a selected quote into executable swap call data.
#[derive(Clone)]
pub struct OperationBuilder {
    reader: Arc<dyn ChainReader>,
    settlement: Arc<dyn SettlementContract>,
    exchanges: ExchangeRegistry,
    chains: Arc<ChainRegistry>,
}

impl OperationBuilder {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        settlement: Arc<dyn SettlementContract>,
        exchanges: ExchangeRegistry,
        chains: Arc<ChainRegistry>,
    ) -> Self {
        Self { reader, settlement, exchanges, chains }
    }

    /// Direct call executing `quote` for `recipient`.
    ///
    /// Wraps and unwraps call the wrapped native contract. Swaps call the
    /// exchange router and attach native value only when selling the native asset.
    pub fn build_baseline_call(
        &self,
        quote: &QuoteResult,
        recipient: Address,
        slippage_bps: u32,
        deadline_timestamp: u64,
    ) -> Result<BaselineCall> {
        let chain = self.chains.get(quote.route.chain_id)?;

        match quote.swap_type {
            SwapType::Wrap => Ok(BaselineCall {
                to: chain.wrapped_native,
                data: Bytes::from(IWrappedNative::depositCall {}.abi_encode()),
                value: quote.amount_in,
            }),
            SwapType::Unwrap => {
                let data = IWrappedNative::withdrawCall { wad: quote.amount_in }.abi_encode();
                Ok(BaselineCall { to: chain.wrapped_native, data: Bytes::from(data), value: U256::ZERO })
            }
            SwapType::ExactIn | SwapType::ExactOut => {
                let adapter = self.exchanges.get(quote.route.exchange)?;
                let data = adapter.swap_calldata(
                    chain,
                    quote,
                    recipient,
                    slippage_bps,
                    U256::from(deadline_timestamp),
                )?;
                let value = if quote.route.is_from_native {
                    quote.max_amount_in(slippage_bps)
                } else {
                    U256::ZERO
                };

                Ok(BaselineCall { to: chain.router(quote.route.exchange), data, value })
            }
        }
    }

    /// Ask the settlement contract for the canonical user operation.
    ///
    /// A revert is surfaced as [`AppError::OperationConstruction`] and not retried.
    #[allow(clippy::too_many_arguments)]
    pub async fn build_user_operation(
        &self,
        chain_id: u64,
        swapper: Address,
        intent: &SwapIntent,
        baseline_call: &BaselineCall,
        deadline: u64,
        gas: u64,
        max_fee_per_gas: U256,
    ) -> Result<UserOperation> {
        let contracts = self.chains.get(chain_id)?.settlement()?;
        self.settlement
            .get_user_operation(
                contracts,
                swapper,
                intent,
                baseline_call,
                deadline,
                gas,
                max_fee_per_gas,
            )
            .await
    }

    /// Baseline call plus, for real swaps, the unsigned user operation.
    pub async fn build_call_data(
        &self,
        quote: &QuoteResult,
        swapper: Address,
        slippage_bps: u32,
        deadline_minutes: u64,
    ) -> Result<SwapCallData> {
        let chain = self.chains.get(quote.route.chain_id)?;
        let contracts = chain.settlement()?;

        let execution_environment =
            self.settlement.get_execution_environment(contracts, swapper).await?;
        let router_deadline =
            current_timestamp().saturating_add(deadline_minutes.saturating_mul(60));
        let baseline_call =
            self.build_baseline_call(quote, execution_environment, slippage_bps, router_deadline)?;

        if quote.swap_type.is_wrap() {
            return Ok(SwapCallData::Wrap {
                baseline_call,
                min_amount_out: quote.amount_out,
                gas_limit: WRAP_GAS_ESTIMATE,
            });
        }

        let current_block = self.reader.block_number().await?;
        let max_fee_per_gas =
            U256::from(self.reader.max_fee_per_gas().await?).saturating_mul(U256::from(2u8));
        let deadline = deadline_block(current_block, deadline_minutes, chain.block_time_ms);
        let gas = SWAP_GAS_ESTIMATE + SOLVER_GAS_ESTIMATE;

        let intent = SwapIntent::from_quote(quote, slippage_bps)?;
        let mut user_operation = self
            .build_user_operation(
                chain.chain_id,
                swapper,
                &intent,
                &baseline_call,
                deadline,
                gas,
                max_fee_per_gas,
            )
            .await?;

        if quote.route.is_from_native {
            user_operation.set_value(intent.amount_user_sells)?;
        }

        tracing::info!(
            swapper = %swapper,
            execution_environment = %execution_environment,
            deadline,
            gas,
            max_fee_per_gas = %max_fee_per_gas,
            "Built user operation"
        );

        Ok(SwapCallData::Swap {
            baseline_call,
            user_operation,
            min_amount_out: intent.min_amount_user_buys,
            gas_limit: gas,
            gas_surcharge: gas_surcharge(gas, max_fee_per_gas),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use alloy::primitives::address;

    pub const EXEC_ENV: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

    /// Settlement fake that echoes its inputs into the operation.
    #[derive(Default)]
    pub struct EchoSettlement {
        pub reject: bool,
    }

    #[async_trait]
    impl SettlementContract for EchoSettlement {
        async fn get_user_operation(
            &self,
            contracts: &SettlementContracts,
            swapper: Address,
            _intent: &SwapIntent,
            baseline_call: &BaselineCall,
            deadline: u64,
            gas: u64,
            max_fee_per_gas: U256,
        ) -> Result<UserOperation> {
            if self.reject {
                return Err(AppError::OperationConstruction("execution reverted".into()));
            }
            Ok(UserOperation::from_abi(IFastLaneOnline::UserOperation {
                from: swapper,
                to: contracts.atlas,
                value: U256::ZERO,
                gas: U256::from(gas),
                maxFeePerGas: max_fee_per_gas,
                nonce: U256::from(1u64),
                deadline: U256::from(deadline),
                dapp: contracts.dapp_control,
                control: contracts.dapp_control,
                callConfig: 0,
                sessionKey: Address::ZERO,
                data: baseline_call.data.clone(),
                signature: Bytes::new(),
            }))
        }

        async fn get_execution_environment(
            &self,
            _contracts: &SettlementContracts,
            _user: Address,
        ) -> Result<Address> {
            Ok(EXEC_ENV)
        }
    }
}
