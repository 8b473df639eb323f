//! Scripted remote signer

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::flow::{RemoteSigner, SigningError};
use crate::signing::SigningEnvelope;
use crate::transaction::decode_transaction;

/// What the signer does with the next envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerBehavior {
    /// Fill every listed input with a placeholder signature
    Sign,
    /// Behave like a user closing the wallet prompt
    Cancel,
    /// Refuse with an error
    Reject,
    /// Sign, but also change an output value
    Tamper,
}

#[derive(Debug)]
pub struct ScriptedSigner {
    behavior: SignerBehavior,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedSigner {
    pub fn new(behavior: SignerBehavior) -> Self {
        Self {
            behavior,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts of every envelope received
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl RemoteSigner for ScriptedSigner {
    async fn sign(&self, envelope: SigningEnvelope) -> Result<Vec<u8>, SigningError> {
        self.prompts.lock().await.push(envelope.user_prompt.clone());

        match self.behavior {
            SignerBehavior::Cancel => return Err(SigningError::Cancelled),
            SignerBehavior::Reject => {
                return Err(SigningError::Rejected("wallet refused".to_string()))
            }
            SignerBehavior::Sign | SignerBehavior::Tamper => {}
        }

        let mut tx = decode_transaction(&envelope.transaction)
            .map_err(|e| SigningError::Rejected(e.to_string()))?;
        for meta in &envelope.source_outputs {
            // <sig(65)> <pubkey(33)>
            let mut unlocking = vec![65];
            unlocking.extend_from_slice(&[0x30; 65]);
            unlocking.push(33);
            unlocking.extend_from_slice(&[0x02; 33]);
            tx.inputs[meta.index].unlocking_bytecode = unlocking;
        }
        if self.behavior == SignerBehavior::Tamper {
            if let Some(change) = tx.outputs.last_mut() {
                change.value += 1;
            }
        }
        tx.encode().map_err(|e| SigningError::Rejected(e.to_string()))
    }
}
