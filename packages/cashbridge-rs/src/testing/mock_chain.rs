//! In-memory chain-query collaborator

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{BridgeError, Result};
use crate::flow::ChainQuery;
use crate::hash::hash256;
use crate::types::{Outpoint, TxId, Utxo};

#[derive(Debug, Default)]
pub struct MockChain {
    utxos: Mutex<Vec<Utxo>>,
    ages: Mutex<HashMap<Outpoint, u64>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_utxo(&self, utxo: Utxo) {
        self.utxos.lock().await.push(utxo);
    }

    pub async fn set_age(&self, outpoint: Outpoint, age: u64) {
        self.ages.lock().await.insert(outpoint, age);
    }

    /// Raw transactions broadcast so far
    pub async fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().await.clone()
    }
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn utxos_for_locking_bytecode(&self, locking_bytecode: &[u8]) -> Result<Vec<Utxo>> {
        Ok(self
            .utxos
            .lock()
            .await
            .iter()
            .filter(|utxo| utxo.locking_bytecode == locking_bytecode)
            .cloned()
            .collect())
    }

    async fn input_age(&self, outpoint: &Outpoint) -> Result<u64> {
        self.ages
            .lock()
            .await
            .get(outpoint)
            .copied()
            .ok_or_else(|| BridgeError::Collaborator(format!("unknown outpoint {}", outpoint)))
    }

    async fn broadcast(&self, transaction: &[u8]) -> Result<TxId> {
        self.broadcasts.lock().await.push(transaction.to_vec());
        Ok(TxId(hash256(transaction)))
    }
}
