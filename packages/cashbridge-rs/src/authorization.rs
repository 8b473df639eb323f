//! Exit authorization signing
//!
//! The exit ledger releases funds only when `processExit` carries a
//! signature from the configured authorizer over
//! `eth_signed(keccak(exit_id || amount || caller))`. [`ExitAuthorizer`]
//! produces exactly that signature with alloy's local signer.

use alloy::primitives::{PrimitiveSignature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::Serialize;
use tracing::info;

use crate::error::{BridgeError, Result};
use crate::hash::{bytes32_to_hex, compute_exit_message_hash, to_eth_signed_message_hash};
use crate::redact::Redacted;
use crate::types::EvmAddress;

/// A signed exit release, ready to submit as `process_exit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitAuthorization {
    pub exit_id: String,
    pub amount: String,
    pub caller: String,
    pub message_hash: String,
    /// `r || s || v` with `v` in {27, 28}
    pub signature: String,
    pub authorizer: String,
}

pub struct ExitAuthorizer {
    signer: PrivateKeySigner,
}

impl std::fmt::Debug for ExitAuthorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitAuthorizer")
            .field("address", &self.address())
            .field("key", &Redacted(()))
            .finish()
    }
}

impl ExitAuthorizer {
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| BridgeError::Authorization(format!("invalid private key: {}", e)))?;
        info!(address = %signer.address(), "Exit authorizer loaded");
        Ok(Self { signer })
    }

    pub fn address(&self) -> EvmAddress {
        EvmAddress(self.signer.address().into_array())
    }

    /// Raw 65-byte signature over the wrapped exit message hash
    pub fn sign_exit(&self, exit_id: &[u8; 32], amount: u128, caller: &str) -> Result<[u8; 65]> {
        let message_hash = compute_exit_message_hash(exit_id, amount, caller);
        let signed_hash = to_eth_signed_message_hash(&message_hash);
        let signature = self
            .signer
            .sign_hash_sync(&B256::from(signed_hash))
            .map_err(|e| BridgeError::Authorization(e.to_string()))?;
        Ok(signature.as_bytes())
    }

    pub fn authorize(&self, exit_id: &[u8; 32], amount: u128, caller: &str) -> Result<ExitAuthorization> {
        let signature = self.sign_exit(exit_id, amount, caller)?;
        Ok(ExitAuthorization {
            exit_id: bytes32_to_hex(exit_id),
            amount: amount.to_string(),
            caller: caller.to_string(),
            message_hash: bytes32_to_hex(&compute_exit_message_hash(exit_id, amount, caller)),
            signature: format!("0x{}", hex::encode(signature)),
            authorizer: self.address().as_hex(),
        })
    }
}

/// Address that signed an exit release
pub fn recover_authorizer(
    exit_id: &[u8; 32],
    amount: u128,
    caller: &str,
    signature: &[u8],
) -> Result<EvmAddress> {
    let signature = PrimitiveSignature::from_raw(signature)
        .map_err(|e| BridgeError::Authorization(format!("malformed signature: {}", e)))?;
    let signed_hash = to_eth_signed_message_hash(&compute_exit_message_hash(exit_id, amount, caller));
    let address = signature
        .recover_address_from_prehash(&B256::from(signed_hash))
        .map_err(|e| BridgeError::Authorization(format!("recovery failed: {}", e)))?;
    Ok(EvmAddress(address.into_array()))
}
