//! Signing protocol for settlement operations.
//!
//! A [`SwapProcess`] walks one swap through approve → sign → swap → success.
//! Each step is triggered by the caller; a failed step records its error and
//! leaves the process where it was so the step can be retried.

use std::{fmt, sync::Arc};

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol_types::{Eip712Domain, SolCall},
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, Result},
    ethereum::{contracts::erc20::IERC20, wallet::TypedDataSigner, ChainReader},
    types::{QuoteResult, SwapCallData, SwapIntent, UserOperation},
};

/// Sign `operation` and check the signature recovers to its sender.
///
/// Any previous signature is discarded first. On a validation failure the
/// new signature is removed again and the operation must be re-signed.
pub async fn sign_user_operation(
    signer: &dyn TypedDataSigner,
    operation: &mut UserOperation,
    domain: &Eip712Domain,
) -> Result<()> {
    operation.clear_signature();

    let signature = signer.sign_user_operation(&operation.to_typed(), domain).await?;
    operation.set_signature(&signature);

    if let Err(e) = operation.validate_signature(domain) {
        operation.clear_signature();
        return Err(e);
    }

    debug!(sender = %operation.sender(), "User operation signature validated");
    Ok(())
}

// ============================================================================
// Collaborators
// ============================================================================

/// Token approval the swapper must grant before the swap can settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApprovalRequest {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
}

/// Grants ERC-20 allowances on behalf of the swapper.
#[async_trait]
pub trait AllowanceManager: Send + Sync {
    async fn approve(&self, request: &ApprovalRequest) -> Result<()>;
}

/// Hands finished swap data to whatever executes it on chain.
#[async_trait]
pub trait SwapSubmitter: Send + Sync {
    /// Submit the swap and return its transaction hash.
    async fn submit(&self, data: &SwapCallData) -> Result<B256>;
}

/// Approval needed before `quote` can be executed by `owner`, if any.
///
/// Selling the native asset never needs one, neither do wraps and unwraps.
/// Otherwise the sold token's allowance to `spender` must cover the amount
/// the swapper is prepared to sell.
pub async fn approval_requirement(
    reader: &dyn ChainReader,
    quote: &QuoteResult,
    owner: Address,
    spender: Address,
    slippage_bps: u32,
) -> Result<Option<ApprovalRequest>> {
    if quote.swap_type.is_wrap() || quote.route.is_from_native {
        return Ok(None);
    }

    let intent = SwapIntent::from_quote(quote, slippage_bps)?;
    let token = intent.token_user_sells;
    let data = IERC20::allowanceCall { owner, spender }.abi_encode();
    let response = reader.call_contract(token, Bytes::from(data), None).await?;
    let allowance = IERC20::allowanceCall::abi_decode_returns(&response)?;

    debug!(
        token = %token,
        owner = %owner,
        spender = %spender,
        allowance = %allowance,
        "Checked allowance"
    );

    if allowance >= intent.amount_user_sells {
        return Ok(None);
    }
    Ok(Some(ApprovalRequest { token, spender, amount: intent.amount_user_sells }))
}

// ============================================================================
// Swap Process
// ============================================================================

/// Step a [`SwapProcess`] is waiting in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStep {
    Approve,
    Sign,
    Swap,
    Success,
}

impl ProcessStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStep::Approve => "approve",
            ProcessStep::Sign => "sign",
            ProcessStep::Swap => "swap",
            ProcessStep::Success => "success",
        }
    }
}

impl fmt::Display for ProcessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum ProcessState {
    Idle,
    Approve { data: SwapCallData, approval: ApprovalRequest },
    Sign { data: SwapCallData },
    Swap { data: SwapCallData },
    Success { data: SwapCallData, tx_hash: B256 },
}

impl ProcessState {
    fn step(&self) -> Option<ProcessStep> {
        match self {
            ProcessState::Idle => None,
            ProcessState::Approve { .. } => Some(ProcessStep::Approve),
            ProcessState::Sign { .. } => Some(ProcessStep::Sign),
            ProcessState::Swap { .. } => Some(ProcessStep::Swap),
            ProcessState::Success { .. } => Some(ProcessStep::Success),
        }
    }

    fn name(&self) -> &'static str {
        self.step().map_or("idle", |step| step.as_str())
    }
}

/// State machine driving one swap from approval to submission.
pub struct SwapProcess {
    state: ProcessState,
    last_error: Option<String>,
    signer: Arc<dyn TypedDataSigner>,
    allowances: Arc<dyn AllowanceManager>,
    submitter: Arc<dyn SwapSubmitter>,
    domain: Eip712Domain,
}

impl SwapProcess {
    /// Create an idle process signing under `domain`.
    pub fn new(
        signer: Arc<dyn TypedDataSigner>,
        allowances: Arc<dyn AllowanceManager>,
        submitter: Arc<dyn SwapSubmitter>,
        domain: Eip712Domain,
    ) -> Self {
        Self { state: ProcessState::Idle, last_error: None, signer, allowances, submitter, domain }
    }

    /// Current step, `None` while idle.
    pub fn step(&self) -> Option<ProcessStep> {
        self.state.step()
    }

    /// Error of the most recent failed action.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Swap data the process is working on.
    pub fn call_data(&self) -> Option<&SwapCallData> {
        match &self.state {
            ProcessState::Idle => None,
            ProcessState::Approve { data, .. }
            | ProcessState::Sign { data }
            | ProcessState::Swap { data }
            | ProcessState::Success { data, .. } => Some(data),
        }
    }

    /// Transaction hash once the swap has been submitted.
    pub fn tx_hash(&self) -> Option<B256> {
        match &self.state {
            ProcessState::Success { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// Begin a new attempt for `data`.
    ///
    /// Starts in approve when `approval` is given, otherwise in sign, and
    /// directly in swap for wraps which carry no user operation.
    pub fn start(
        &mut self,
        data: SwapCallData,
        approval: Option<ApprovalRequest>,
    ) -> Result<ProcessStep> {
        self.last_error = None;
        if !matches!(self.state, ProcessState::Idle) {
            return Err(self.reject("start"));
        }

        self.state = match approval {
            Some(approval) => ProcessState::Approve { data, approval },
            None if data.is_wrap() => ProcessState::Swap { data },
            None => ProcessState::Sign { data },
        };
        Ok(self.entered())
    }

    /// Grant the pending approval.
    pub async fn approve(&mut self) -> Result<ProcessStep> {
        self.last_error = None;
        let approval = match &self.state {
            ProcessState::Approve { approval, .. } => *approval,
            _ => return Err(self.reject("approve")),
        };

        if let Err(e) = self.allowances.approve(&approval).await {
            return Err(self.fail(AppError::ApproveFailed(e.to_string())));
        }

        if let ProcessState::Approve { data, .. } =
            std::mem::replace(&mut self.state, ProcessState::Idle)
        {
            self.state = if data.is_wrap() {
                ProcessState::Swap { data }
            } else {
                ProcessState::Sign { data }
            };
        }
        Ok(self.entered())
    }

    /// Sign the user operation and validate the signature.
    pub async fn sign(&mut self) -> Result<ProcessStep> {
        self.last_error = None;
        let signer = Arc::clone(&self.signer);
        let outcome = match &mut self.state {
            ProcessState::Sign { data } => match data.user_operation_mut() {
                Some(operation) => {
                    sign_user_operation(signer.as_ref(), operation, &self.domain).await
                }
                None => Err(AppError::OperationConstruction(
                    "swap data has no user operation to sign".into(),
                )),
            },
            _ => return Err(self.reject("sign")),
        };

        if let Err(e) = outcome {
            return Err(self.fail(e));
        }

        if let ProcessState::Sign { data } = std::mem::replace(&mut self.state, ProcessState::Idle)
        {
            self.state = ProcessState::Swap { data };
        }
        Ok(self.entered())
    }

    /// Submit the swap.
    pub async fn swap(&mut self) -> Result<ProcessStep> {
        self.last_error = None;
        let outcome = match &self.state {
            ProcessState::Swap { data } => self.submitter.submit(data).await,
            _ => return Err(self.reject("swap")),
        };

        let tx_hash = match outcome {
            Ok(tx_hash) => tx_hash,
            Err(e) => return Err(self.fail(AppError::SwapFailed(e.to_string()))),
        };

        if let ProcessState::Swap { data } = std::mem::replace(&mut self.state, ProcessState::Idle)
        {
            self.state = ProcessState::Success { data, tx_hash };
        }
        info!(tx_hash = %tx_hash, "Swap submitted");
        Ok(self.entered())
    }

    /// Drop the swap data, including any signature, and return to idle.
    pub fn reset(&mut self) {
        debug!(step = self.state.name(), "Resetting swap process");
        self.state = ProcessState::Idle;
        self.last_error = None;
    }

    fn entered(&self) -> ProcessStep {
        let step = self.state.step().unwrap_or(ProcessStep::Approve);
        debug!(step = %step, "Swap process advanced");
        step
    }

    fn reject(&mut self, action: &'static str) -> AppError {
        self.fail(AppError::InvalidTransition { action, step: self.state.name() })
    }

    fn fail(&mut self, error: AppError) -> AppError {
        warn!(step = self.state.name(), error = %error, "Swap process action failed");
        self.last_error = Some(error.to_string());
        error
    }
}
