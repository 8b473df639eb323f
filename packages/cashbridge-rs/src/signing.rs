//! Remote signing handoff
//!
//! A remote wallet only sees raw transaction bytes; it cannot look up the
//! outputs those inputs spend. The envelope built here carries, for every
//! input the wallet must unlock, the locking bytecode, value and token data
//! of the spent output so the wallet can compute its signature hash.
//!
//! Envelopes are single-use: [`SigningEnvelope`] is not `Clone`, signers take
//! it by value, and a cancelled request is simply dropped. Rebuilding from the
//! same UTXOs yields the same envelope.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::UnsignedTransaction;
use crate::error::{BridgeError, Result};
use crate::transaction::{decode_transaction, Transaction};
use crate::types::{Outpoint, TokenData};

/// What a remote signer needs to know about one input it must unlock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMetadata {
    pub index: usize,
    pub outpoint: Outpoint,
    #[serde(with = "hex")]
    pub locking_bytecode: Vec<u8>,
    pub value: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenData>,
}

/// Signing request handed to an external wallet or co-signer
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningEnvelope {
    /// Wire-format transaction with remote inputs' unlocking data cleared
    #[serde(with = "hex")]
    pub transaction: Vec<u8>,
    pub source_outputs: Vec<InputMetadata>,
    /// Whether the signer should broadcast after signing
    pub broadcast: bool,
    pub user_prompt: String,
}

impl SigningEnvelope {
    pub fn remote_indexes(&self) -> Vec<usize> {
        self.source_outputs.iter().map(|m| m.index).collect()
    }
}

fn invalid(index: usize, reason: impl Into<String>) -> BridgeError {
    BridgeError::InvalidSigningTarget {
        index,
        reason: reason.into(),
    }
}

/// Package an unsigned transaction for a remote signer
///
/// Every listed input must exist, appear once, have no unlocking data yet,
/// and spend the UTXO recorded for it. Nothing already signed is ever
/// overwritten.
pub fn prepare_for_remote_signing(
    unsigned: &UnsignedTransaction,
    inputs_needing_remote_sig: &[usize],
    broadcast: bool,
) -> Result<SigningEnvelope> {
    let mut transaction = decode_transaction(&unsigned.encoded)?;
    let mut seen = BTreeSet::new();
    let mut source_outputs = Vec::with_capacity(inputs_needing_remote_sig.len());

    for &index in inputs_needing_remote_sig {
        if !seen.insert(index) {
            return Err(invalid(index, "listed more than once"));
        }
        let input = transaction.inputs.get_mut(index).ok_or_else(|| {
            invalid(
                index,
                format!("transaction has {} inputs", unsigned.transaction.inputs.len()),
            )
        })?;
        if !input.unlocking_bytecode.is_empty() {
            return Err(invalid(index, "input already carries unlocking data"));
        }
        let utxo = unsigned
            .source_utxos
            .get(index)
            .ok_or_else(|| invalid(index, "no source output recorded"))?;
        if utxo.outpoint() != input.outpoint {
            return Err(invalid(
                index,
                format!("input spends {}, recorded source is {}", input.outpoint, utxo.outpoint()),
            ));
        }

        input.unlocking_bytecode.clear();
        source_outputs.push(InputMetadata {
            index,
            outpoint: input.outpoint,
            locking_bytecode: utxo.locking_bytecode.clone(),
            value: utxo.satoshis,
            token: utxo.token.clone(),
        });
        debug!(index, outpoint = %input.outpoint, "Prepared input for remote signing");
    }

    let envelope = SigningEnvelope {
        transaction: transaction.encode()?,
        source_outputs,
        broadcast,
        user_prompt: unsigned.action.prompt().to_string(),
    };
    info!(
        prompt = %envelope.user_prompt,
        inputs = ?envelope.remote_indexes(),
        broadcast,
        "Signing envelope ready"
    );
    Ok(envelope)
}

/// Check a signer's result against what was built
///
/// Only the remote inputs' unlocking data may differ, and each of them must
/// now be filled in.
pub fn verify_signed(unsigned: &UnsignedTransaction, signed: &[u8]) -> Result<Transaction> {
    let signed_tx = decode_transaction(signed)?;
    let built = &unsigned.transaction;

    if signed_tx.version != built.version || signed_tx.locktime != built.locktime {
        return Err(BridgeError::SignatureMismatch(
            "version or locktime changed".to_string(),
        ));
    }
    if signed_tx.outputs != built.outputs {
        return Err(BridgeError::SignatureMismatch("outputs changed".to_string()));
    }
    if signed_tx.inputs.len() != built.inputs.len() {
        return Err(BridgeError::SignatureMismatch(format!(
            "expected {} inputs, got {}",
            built.inputs.len(),
            signed_tx.inputs.len()
        )));
    }

    for (index, (signed_input, built_input)) in signed_tx.inputs.iter().zip(&built.inputs).enumerate() {
        if signed_input.outpoint != built_input.outpoint
            || signed_input.sequence != built_input.sequence
        {
            return Err(BridgeError::SignatureMismatch(format!(
                "input {} outpoint or sequence changed",
                index
            )));
        }
        if unsigned.remote_inputs.contains(&index) {
            if signed_input.unlocking_bytecode.is_empty() {
                return Err(BridgeError::SignatureMismatch(format!(
                    "input {} was not signed",
                    index
                )));
            }
        } else if signed_input.unlocking_bytecode != built_input.unlocking_bytecode {
            return Err(BridgeError::SignatureMismatch(format!(
                "input {} unlocking data changed",
                index
            )));
        }
    }

    Ok(signed_tx)
}
