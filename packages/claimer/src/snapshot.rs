//! File-backed chain query
//!
//! The claimer runs offline: an operator exports the UTXOs of the bridge
//! contract and the user address (plus confirmation counts of claim NFTs) to
//! a JSON file, and the claimer builds envelopes against that.
//!
//! ```json
//! {
//!   "utxos": [{ "txid": "..", "vout": 0, "satoshis": 1000,
//!               "lockingBytecode": "76a914..88ac", "token": { .. } }],
//!   "ages": { "<txid>:<vout>": 150 }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use cashbridge_rs::{BridgeError, ChainQuery, Outpoint, TxId, Utxo};
use eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    utxos: Vec<Utxo>,
    #[serde(default)]
    ages: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    utxos: Vec<Utxo>,
    ages: HashMap<Outpoint, u64>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot = Self::from_json(&raw)
            .wrap_err_with(|| format!("Failed to parse snapshot {}", path.display()))?;
        debug!(
            path = %path.display(),
            utxos = snapshot.utxos.len(),
            ages = snapshot.ages.len(),
            "Loaded UTXO snapshot"
        );
        Ok(snapshot)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(raw)?;
        let ages = file
            .ages
            .into_iter()
            .map(|(outpoint, age)| {
                Outpoint::parse(&outpoint)
                    .map(|outpoint| (outpoint, age))
                    .wrap_err_with(|| format!("Invalid age key {:?}", outpoint))
            })
            .collect::<Result<_>>()?;
        Ok(Self {
            utxos: file.utxos,
            ages,
        })
    }

    pub fn utxos(&self) -> &[Utxo] {
        &self.utxos
    }
}

#[async_trait]
impl ChainQuery for Snapshot {
    async fn utxos_for_locking_bytecode(
        &self,
        locking_bytecode: &[u8],
    ) -> cashbridge_rs::Result<Vec<Utxo>> {
        Ok(self
            .utxos
            .iter()
            .filter(|utxo| utxo.locking_bytecode == locking_bytecode)
            .cloned()
            .collect())
    }

    async fn input_age(&self, outpoint: &Outpoint) -> cashbridge_rs::Result<u64> {
        self.ages.get(outpoint).copied().ok_or_else(|| {
            BridgeError::Collaborator(format!("snapshot has no age for {}", outpoint))
        })
    }

    async fn broadcast(&self, _transaction: &[u8]) -> cashbridge_rs::Result<TxId> {
        Err(BridgeError::Collaborator(
            "offline snapshot cannot broadcast".to_string(),
        ))
    }
}
