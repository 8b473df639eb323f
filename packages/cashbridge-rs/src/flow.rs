//! Claim and exit orchestration
//!
//! Ties the pure components to the two external collaborators: a chain-query
//! service (UTXO lookups, input ages, broadcast) and a remote signer. The
//! core never owns connection state; both collaborators are passed in.
//!
//! Nothing on this side changes until a signed transaction is broadcast, so a
//! cancelled or failed signing round can always be retried by preparing
//! again.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::address_codec::CashAddress;
use crate::builder::{check_maturity, TransactionBuilder, UnsignedTransaction};
use crate::error::{BridgeError, Result};
use crate::selection::{
    select_claim_nfts, select_deposit_utxo, select_funding_utxo, select_reserve_utxo,
    ClaimCandidate,
};
use crate::signing::{prepare_for_remote_signing, verify_signed, SigningEnvelope};
use crate::types::{ExitDestination, Outpoint, TxId, Utxo};

// ============================================================================
// Collaborators
// ============================================================================

/// Read and broadcast access to the UTXO chain
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Unspent outputs locked by `locking_bytecode`
    async fn utxos_for_locking_bytecode(&self, locking_bytecode: &[u8]) -> Result<Vec<Utxo>>;

    /// Confirmations the output at `outpoint` has accumulated
    async fn input_age(&self, outpoint: &Outpoint) -> Result<u64>;

    /// Submit a fully signed transaction
    async fn broadcast(&self, transaction: &[u8]) -> Result<TxId>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("User cancelled the signing request")]
    Cancelled,

    #[error("Signer rejected the request: {0}")]
    Rejected(String),
}

/// External wallet or co-signer
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    /// Unlock the envelope's listed inputs and return the full transaction
    async fn sign(&self, envelope: SigningEnvelope) -> std::result::Result<Vec<u8>, SigningError>;
}

// ============================================================================
// Flow
// ============================================================================

/// A built transaction and its pending signing request
#[derive(Debug)]
pub struct PreparedTransaction {
    pub unsigned: UnsignedTransaction,
    pub envelope: SigningEnvelope,
}

pub struct BridgeFlow<C, S> {
    chain: C,
    signer: S,
    builder: TransactionBuilder,
}

impl<C: ChainQuery, S> BridgeFlow<C, S> {
    pub fn new(chain: C, signer: S, builder: TransactionBuilder) -> Self {
        Self {
            chain,
            signer,
            builder,
        }
    }

    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Fetch the contract's and the user's UTXOs concurrently
    async fn fetch(&self, user_locking: &[u8]) -> Result<(Vec<Utxo>, Vec<Utxo>)> {
        let contract_locking = self.builder.contract().locking_bytecode();
        tokio::try_join!(
            self.chain.utxos_for_locking_bytecode(&contract_locking),
            self.chain.utxos_for_locking_bytecode(user_locking),
        )
    }

    /// Build a claim for one of `user`'s claim NFTs
    ///
    /// Picks `claim` if given, otherwise the first matured claim NFT by
    /// outpoint. Fails with `Immature` when the chosen NFT (or, without
    /// `claim`, every NFT) is younger than its committed minimum age.
    pub async fn prepare_claim(
        &self,
        user: &CashAddress,
        claim: Option<Outpoint>,
    ) -> Result<PreparedTransaction> {
        let user_locking = user.locking_bytecode()?;
        let (contract_utxos, user_utxos) = self.fetch(&user_locking).await?;

        let registry = self.builder.registry();
        let reserve = select_reserve_utxo(&contract_utxos, self.builder.contract(), registry)?;

        let claims = select_claim_nfts(&user_utxos, registry);
        let candidate = match claim {
            Some(outpoint) => {
                let candidate = claims
                    .into_iter()
                    .find(|c| c.utxo.outpoint() == outpoint)
                    .ok_or_else(|| {
                        BridgeError::ClaimNotFound(format!("no claim NFT at {}", outpoint))
                    })?;
                self.ensure_mature(&candidate).await?;
                candidate
            }
            None => self.first_mature(claims, user).await?,
        };

        let funding = select_funding_utxo(&user_utxos, self.builder.claim_funding_required())?;
        let unsigned = self
            .builder
            .build_claim(&reserve, &candidate.utxo, &funding, user)?;
        let envelope = prepare_for_remote_signing(&unsigned, &unsigned.remote_inputs, false)?;

        Ok(PreparedTransaction { unsigned, envelope })
    }

    async fn ensure_mature(&self, candidate: &ClaimCandidate) -> Result<()> {
        let outpoint = candidate.utxo.outpoint();
        let age = self.chain.input_age(&outpoint).await?;
        if let Err(e) = check_maturity(&candidate.utxo, age) {
            warn!(claim = %outpoint, age, min_age = candidate.commitment.min_age, "Claim NFT not mature");
            return Err(e);
        }
        Ok(())
    }

    /// First matured claim by outpoint; the first immaturity error if none is
    async fn first_mature(
        &self,
        claims: Vec<ClaimCandidate>,
        user: &CashAddress,
    ) -> Result<ClaimCandidate> {
        let mut first_error = None;
        for candidate in claims {
            match self.ensure_mature(&candidate).await {
                Ok(()) => return Ok(candidate),
                Err(e @ BridgeError::Immature { .. }) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(first_error.unwrap_or_else(|| {
            BridgeError::ClaimNotFound(format!("{} holds no claim NFTs", user))
        }))
    }

    /// Build an exit depositing the user's largest reserve-token UTXO
    pub async fn prepare_exit(
        &self,
        user: &CashAddress,
        destination: ExitDestination,
    ) -> Result<PreparedTransaction> {
        let user_locking = user.locking_bytecode()?;
        let (contract_utxos, user_utxos) = self.fetch(&user_locking).await?;

        let registry = self.builder.registry();
        let reserve = select_reserve_utxo(&contract_utxos, self.builder.contract(), registry)?;
        let deposit = select_deposit_utxo(&user_utxos, registry.reserve_category())?;
        let required = self
            .builder
            .exit_funding_required()
            .saturating_sub(deposit.satoshis);
        let funding = select_funding_utxo(&user_utxos, required)?;

        let unsigned = self
            .builder
            .build_exit(&reserve, &deposit, &funding, &destination, user)?;
        let envelope = prepare_for_remote_signing(&unsigned, &unsigned.remote_inputs, false)?;

        Ok(PreparedTransaction { unsigned, envelope })
    }
}

impl<C: ChainQuery, S: RemoteSigner> BridgeFlow<C, S> {
    /// Hand the envelope to the signer, verify the result, and broadcast
    pub async fn complete(&self, prepared: PreparedTransaction) -> Result<TxId> {
        let PreparedTransaction { unsigned, envelope } = prepared;
        let action = unsigned.action;

        let signed = self.signer.sign(envelope).await.map_err(|e| match e {
            SigningError::Cancelled => {
                info!(action = action.prompt(), "Signing cancelled");
                BridgeError::SigningCancelled
            }
            SigningError::Rejected(reason) => BridgeError::Collaborator(reason),
        })?;

        let local_txid = verify_signed(&unsigned, &signed)?.txid()?;
        let txid = self.chain.broadcast(&signed).await?;
        if txid != local_txid {
            warn!(txid = %txid, local_txid = %local_txid, "Broadcast txid differs from local hash");
        }
        info!(action = action.prompt(), txid = %txid, "Broadcast bridge transaction");
        Ok(txid)
    }
}
