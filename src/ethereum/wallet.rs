//! Wallet management and typed-data signing.

use alloy::{
    primitives::{Address, Signature},
    signers::{local::PrivateKeySigner, Signer},
    sol_types::{Eip712Domain, SolStruct},
};
use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    ethereum::contracts::atlas::typed,
};

/// Signer boundary used by the signing protocol.
///
/// Receives the typed-data domain and the operation values and returns a
/// signature. Nothing else about the signer is assumed.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// Address the signer signs for.
    fn address(&self) -> Address;

    /// Sign the EIP-712 representation of a user operation.
    async fn sign_user_operation(
        &self,
        operation: &typed::UserOperation,
        domain: &Eip712Domain,
    ) -> Result<Signature>;
}

/// Wallet manager backed by a local private key.
#[derive(Clone)]
pub struct WalletManager {
    /// The local signer.
    signer: PrivateKeySigner,
    /// Wallet address.
    address: Address,
}

impl WalletManager {
    /// Create a wallet manager from a private key string.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let key = private_key.strip_prefix("0x").unwrap_or(private_key);

        let signer: PrivateKeySigner =
            key.parse().map_err(|e: alloy::signers::local::LocalSignerError| {
                AppError::Wallet(e.to_string())
            })?;

        let address = signer.address();

        tracing::info!(address = %address, "Wallet initialized");

        Ok(Self { signer, address })
    }

    /// Get the wallet address.
    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl TypedDataSigner for WalletManager {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_user_operation(
        &self,
        operation: &typed::UserOperation,
        domain: &Eip712Domain,
    ) -> Result<Signature> {
        let hash = operation.eip712_signing_hash(domain);
        let signature = self.signer.sign_hash(&hash).await?;
        tracing::debug!(signer = %self.address, hash = %hash, "Signed user operation");
        Ok(signature)
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager").field("address", &self.address).finish()
    }
}
