//! Settlement operation types.
//!
//! A swap is executed either as a plain baseline call (wraps) or as an Atlas
//! user operation that carries the baseline call as its fallback path.

use alloy::{
    primitives::{keccak256, Address, Bytes, Signature, B256, U256},
    sol_types::{Eip712Domain, SolStruct},
};

use crate::{
    error::{AppError, Result},
    ethereum::{
        constants::NATIVE_TOKEN_ADDRESS,
        contracts::atlas::{typed, IFastLaneOnline},
    },
    types::{QuoteResult, SwapType},
};

/// What the user is willing to trade, after slippage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub token_user_buys: Address,
    pub min_amount_user_buys: U256,
    pub token_user_sells: Address,
    pub amount_user_sells: U256,
}

impl SwapIntent {
    /// Derive the intent from a quote.
    ///
    /// Exact-in sells the quoted input and buys at least the slippage-adjusted
    /// output. Exact-out buys the quoted output and sells at most the
    /// slippage-adjusted input. Native endpoints use the native address.
    pub fn from_quote(quote: &QuoteResult, slippage_bps: u32) -> Result<Self> {
        let route = &quote.route;
        let routed_in = route
            .token_in()
            .ok_or_else(|| AppError::OperationConstruction("quote route has no steps".into()))?;
        let routed_out = route
            .token_out()
            .ok_or_else(|| AppError::OperationConstruction("quote route has no steps".into()))?;

        let token_user_sells = if route.is_from_native { NATIVE_TOKEN_ADDRESS } else { routed_in };
        let token_user_buys = if route.is_to_native { NATIVE_TOKEN_ADDRESS } else { routed_out };

        let (min_amount_user_buys, amount_user_sells) = match quote.swap_type {
            SwapType::ExactOut => (quote.amount_out, quote.max_amount_in(slippage_bps)),
            _ => (quote.min_amount_out(slippage_bps), quote.amount_in),
        };

        Ok(Self { token_user_buys, min_amount_user_buys, token_user_sells, amount_user_sells })
    }

    pub fn to_abi(&self) -> IFastLaneOnline::SwapIntent {
        IFastLaneOnline::SwapIntent {
            tokenUserBuys: self.token_user_buys,
            minAmountUserBuys: self.min_amount_user_buys,
            tokenUserSells: self.token_user_sells,
            amountUserSells: self.amount_user_sells,
        }
    }
}

/// Direct call to the exchange router, used as the guaranteed fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl BaselineCall {
    pub fn to_abi(&self) -> IFastLaneOnline::BaselineCall {
        IFastLaneOnline::BaselineCall { to: self.to, data: self.data.clone(), value: self.value }
    }
}

/// Atlas user operation.
///
/// Built from the canonical structure returned by the dapp control contract.
/// Fields stay mutable until a signature is attached.
#[derive(Debug, Clone)]
pub struct UserOperation {
    inner: IFastLaneOnline::UserOperation,
}

impl UserOperation {
    pub fn from_abi(inner: IFastLaneOnline::UserOperation) -> Self {
        Self { inner }
    }

    pub fn as_abi(&self) -> &IFastLaneOnline::UserOperation {
        &self.inner
    }

    /// Swapper the operation is built for.
    pub fn sender(&self) -> Address {
        self.inner.from
    }

    pub fn value(&self) -> U256 {
        self.inner.value
    }

    pub fn gas(&self) -> U256 {
        self.inner.gas
    }

    pub fn max_fee_per_gas(&self) -> U256 {
        self.inner.maxFeePerGas
    }

    pub fn deadline(&self) -> U256 {
        self.inner.deadline
    }

    /// Native value forwarded with the operation.
    pub fn set_value(&mut self, value: U256) -> Result<()> {
        self.ensure_unsigned("value")?;
        self.inner.value = value;
        Ok(())
    }

    /// EIP-712 view of the operation. Calldata is committed by hash.
    pub fn to_typed(&self) -> typed::UserOperation {
        let op = &self.inner;
        typed::UserOperation {
            from: op.from,
            to: op.to,
            value: op.value,
            gas: op.gas,
            maxFeePerGas: op.maxFeePerGas,
            nonce: op.nonce,
            deadline: op.deadline,
            dapp: op.dapp,
            control: op.control,
            callConfig: op.callConfig,
            sessionKey: op.sessionKey,
            data: keccak256(&op.data),
        }
    }

    pub fn signing_hash(&self, domain: &Eip712Domain) -> B256 {
        self.to_typed().eip712_signing_hash(domain)
    }

    pub fn is_signed(&self) -> bool {
        !self.inner.signature.is_empty()
    }

    pub fn signature(&self) -> &Bytes {
        &self.inner.signature
    }

    pub fn set_signature(&mut self, signature: &Signature) {
        self.inner.signature = Bytes::from(signature.as_bytes().to_vec());
    }

    pub fn clear_signature(&mut self) {
        self.inner.signature = Bytes::new();
    }

    /// Check that the attached signature recovers to `from` under `domain`.
    pub fn validate_signature(&self, domain: &Eip712Domain) -> Result<()> {
        let expected = self.inner.from;
        let signature = Signature::try_from(self.inner.signature.as_ref()).map_err(|e| {
            AppError::SignatureValidation { expected, reason: format!("malformed signature: {}", e) }
        })?;

        let recovered =
            signature.recover_address_from_prehash(&self.signing_hash(domain)).map_err(|e| {
                AppError::SignatureValidation { expected, reason: format!("recovery failed: {}", e) }
            })?;

        if recovered != expected {
            return Err(AppError::SignatureValidation {
                expected,
                reason: format!("recovered {}", recovered),
            });
        }

        Ok(())
    }

    fn ensure_unsigned(&self, field: &str) -> Result<()> {
        if self.is_signed() {
            return Err(AppError::OperationConstruction(format!(
                "cannot modify {} of a signed user operation",
                field
            )));
        }
        Ok(())
    }
}

/// Everything needed to execute a quoted swap.
#[derive(Debug, Clone)]
pub enum SwapCallData {
    /// Plain wrap or unwrap of the native asset.
    Wrap { baseline_call: BaselineCall, min_amount_out: U256, gas_limit: u64 },
    /// Atlas settled swap.
    Swap {
        baseline_call: BaselineCall,
        user_operation: UserOperation,
        min_amount_out: U256,
        gas_limit: u64,
        /// Atlas gas surcharge in wei.
        gas_surcharge: U256,
    },
}

impl SwapCallData {
    pub fn baseline_call(&self) -> &BaselineCall {
        match self {
            SwapCallData::Wrap { baseline_call, .. } | SwapCallData::Swap { baseline_call, .. } => {
                baseline_call
            }
        }
    }

    pub fn min_amount_out(&self) -> U256 {
        match self {
            SwapCallData::Wrap { min_amount_out, .. } | SwapCallData::Swap { min_amount_out, .. } => {
                *min_amount_out
            }
        }
    }

    pub fn gas_limit(&self) -> u64 {
        match self {
            SwapCallData::Wrap { gas_limit, .. } | SwapCallData::Swap { gas_limit, .. } => {
                *gas_limit
            }
        }
    }

    pub fn gas_surcharge(&self) -> U256 {
        match self {
            SwapCallData::Wrap { .. } => U256::ZERO,
            SwapCallData::Swap { gas_surcharge, .. } => *gas_surcharge,
        }
    }

    pub fn is_wrap(&self) -> bool {
        matches!(self, SwapCallData::Wrap { .. })
    }

    pub fn user_operation(&self) -> Option<&UserOperation> {
        match self {
            SwapCallData::Wrap { .. } => None,
            SwapCallData::Swap { user_operation, .. } => Some(user_operation),
        }
    }

    pub fn user_operation_mut(&mut self) -> Option<&mut UserOperation> {
        match self {
            SwapCallData::Wrap { .. } => None,
            SwapCallData::Swap { user_operation, .. } => Some(user_operation),
        }
    }

    /// Wraps never need a signature.
    pub fn is_signed(&self) -> bool {
        self.user_operation().is_some_and(UserOperation::is_signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ethereum::{wallet::TypedDataSigner, WalletManager},
        types::{Exchange, SwapRoute, SwapStep},
    };
    use alloy::primitives::address;
    use alloy::sol_types::eip712_domain;

    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const USDC: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");
    const WMATIC: Address = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");

    fn quote(swap_type: SwapType, is_from_native: bool, is_to_native: bool) -> QuoteResult {
        QuoteResult {
            swap_type,
            amount_in: U256::from(1_000_000u64),
            amount_out: U256::from(2_000_000u64),
            route: SwapRoute {
                chain_id: 137,
                exchange: Exchange::UniswapV2,
                steps: vec![SwapStep::new(USDC, WMATIC)],
                is_from_native,
                is_to_native,
            },
            price_impact: None,
        }
    }

    fn operation(from: Address) -> UserOperation {
        UserOperation::from_abi(IFastLaneOnline::UserOperation {
            from,
            to: address!("4A394bD4Bc2f4309ac0b75c052b242ba3e0f32e0"),
            value: U256::ZERO,
            gas: U256::from(850_000u64),
            maxFeePerGas: U256::from(60_000_000_000u64),
            nonce: U256::from(3u64),
            deadline: U256::from(60_000_000u64),
            dapp: address!("1111111111111111111111111111111111111111"),
            control: address!("1111111111111111111111111111111111111111"),
            callConfig: 0,
            sessionKey: Address::ZERO,
            data: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            signature: Bytes::new(),
        })
    }

    fn domain(chain_id: u64) -> Eip712Domain {
        eip712_domain! {
            name: "AtlasVerification",
            version: "1.0",
            chain_id: chain_id,
            verifying_contract: address!("2222222222222222222222222222222222222222"),
        }
    }

    #[test]
    fn test_intent_exact_in_applies_slippage_to_output() {
        let intent = SwapIntent::from_quote(&quote(SwapType::ExactIn, false, false), 50).unwrap();
        assert_eq!(intent.token_user_sells, USDC);
        assert_eq!(intent.token_user_buys, WMATIC);
        assert_eq!(intent.amount_user_sells, U256::from(1_000_000u64));
        assert_eq!(intent.min_amount_user_buys, U256::from(1_990_000u64));
    }

    #[test]
    fn test_intent_exact_out_applies_slippage_to_input() {
        let intent = SwapIntent::from_quote(&quote(SwapType::ExactOut, false, false), 100).unwrap();
        assert_eq!(intent.min_amount_user_buys, U256::from(2_000_000u64));
        assert_eq!(intent.amount_user_sells, U256::from(1_010_000u64));
    }

    #[test]
    fn test_intent_uses_native_address_for_native_endpoints() {
        let intent = SwapIntent::from_quote(&quote(SwapType::ExactIn, false, true), 50).unwrap();
        assert_eq!(intent.token_user_buys, NATIVE_TOKEN_ADDRESS);
        assert_eq!(intent.token_user_sells, USDC);

        let abi = intent.to_abi();
        assert_eq!(abi.tokenUserBuys, Address::ZERO);
    }

    #[test]
    fn test_typed_view_hashes_calldata() {
        let op = operation(Address::ZERO);
        let typed = op.to_typed();
        assert_eq!(typed.data, keccak256([0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(typed.gas, U256::from(850_000u64));
    }

    #[tokio::test]
    async fn test_signed_operation_validates() {
        let wallet = WalletManager::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let mut op = operation(wallet.address());

        let signature = wallet.sign_user_operation(&op.to_typed(), &domain(137)).await.unwrap();
        op.set_signature(&signature);

        assert!(op.is_signed());
        assert_eq!(op.signature().len(), 65);
        assert!(op.validate_signature(&domain(137)).is_ok());
    }

    #[tokio::test]
    async fn test_signature_for_other_domain_is_rejected() {
        let wallet = WalletManager::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let mut op = operation(wallet.address());

        let signature = wallet.sign_user_operation(&op.to_typed(), &domain(1)).await.unwrap();
        op.set_signature(&signature);

        match op.validate_signature(&domain(137)) {
            Err(AppError::SignatureValidation { expected, .. }) => {
                assert_eq!(expected, wallet.address())
            }
            other => panic!("Expected SignatureValidation, got {:?}", other),
        }
    }

    #[test]
    fn test_unsigned_operation_fails_validation() {
        let op = operation(Address::ZERO);
        assert!(!op.is_signed());
        assert!(matches!(
            op.validate_signature(&domain(137)),
            Err(AppError::SignatureValidation { .. })
        ));
    }

    #[test]
    fn test_malformed_signature_fails_validation() {
        let mut op = operation(Address::ZERO);
        op.inner.signature = Bytes::from(vec![0x01; 10]);

        match op.validate_signature(&domain(137)) {
            Err(AppError::SignatureValidation { reason, .. }) => {
                assert!(reason.starts_with("malformed signature"))
            }
            other => panic!("Expected SignatureValidation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signed_operation_is_frozen() {
        let wallet = WalletManager::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let mut op = operation(wallet.address());
        op.set_value(U256::from(5u64)).unwrap();

        let signature = wallet.sign_user_operation(&op.to_typed(), &domain(137)).await.unwrap();
        op.set_signature(&signature);
        assert!(op.set_value(U256::from(6u64)).is_err());

        op.clear_signature();
        assert!(op.set_value(U256::from(6u64)).is_ok());
        assert_eq!(op.value(), U256::from(6u64));
    }

    #[test]
    fn test_call_data_accessors() {
        let baseline = BaselineCall { to: WMATIC, data: Bytes::new(), value: U256::from(7u64) };
        let wrap = SwapCallData::Wrap {
            baseline_call: baseline.clone(),
            min_amount_out: U256::from(7u64),
            gas_limit: 50_000,
        };
        assert!(wrap.is_wrap());
        assert!(!wrap.is_signed());
        assert!(wrap.user_operation().is_none());
        assert_eq!(wrap.gas_surcharge(), U256::ZERO);

        let swap = SwapCallData::Swap {
            baseline_call: baseline,
            user_operation: operation(Address::ZERO),
            min_amount_out: U256::from(1u64),
            gas_limit: 850_000,
            gas_surcharge: U256::from(42u64),
        };
        assert!(!swap.is_wrap());
        assert!(!swap.is_signed());
        assert_eq!(swap.gas_limit(), 850_000);
        assert_eq!(swap.gas_surcharge(), U256::from(42u64));
    }
}
