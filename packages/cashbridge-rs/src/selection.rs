//! UTXO selection
//!
//! Picks the inputs a claim or exit transaction needs out of the raw UTXO
//! lists the chain-query collaborator returns. Selection only filters and
//! orders; it never fetches.

use tracing::{debug, warn};

use crate::category::CategoryRegistry;
use crate::commitment::{self, Commitment};
use crate::covenant::BridgeContract;
use crate::error::{BridgeError, InputRole, Result};
use crate::types::{Capability, TokenCategory, Utxo};

/// A claim NFT whose commitment decoded cleanly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCandidate {
    pub utxo: Utxo,
    pub commitment: Commitment,
}

/// The single live reserve UTXO held by the bridge contract
///
/// The covenant keeps exactly one reserve output alive. Seeing zero or
/// several means the snapshot is stale or the contract is misconfigured.
pub fn select_reserve_utxo(
    candidates: &[Utxo],
    contract: &BridgeContract,
    registry: &CategoryRegistry,
) -> Result<Utxo> {
    let locking = contract.locking_bytecode();
    let reserve_category = registry.reserve_category();

    let mut matches = candidates.iter().filter(|utxo| {
        utxo.locking_bytecode == locking
            && utxo
                .token
                .as_ref()
                .is_some_and(|t| t.category == reserve_category && t.nft.is_none())
    });

    let reserve = matches.next().ok_or_else(|| {
        BridgeError::ReserveUnavailable(format!(
            "no {} reserve output at the bridge contract",
            reserve_category
        ))
    })?;
    if let Some(extra) = matches.next() {
        warn!(first = %reserve.outpoint(), second = %extra.outpoint(), "Multiple reserve outputs in snapshot");
        return Err(BridgeError::ReserveUnavailable(
            "more than one reserve output; refresh the UTXO snapshot".to_string(),
        ));
    }

    debug!(outpoint = %reserve.outpoint(), "Selected reserve UTXO");
    Ok(reserve.clone())
}

/// All usable claim NFTs, ordered by outpoint
pub fn select_claim_nfts(candidates: &[Utxo], registry: &CategoryRegistry) -> Vec<ClaimCandidate> {
    let claim_category = registry.claim_category();
    let mut claims: Vec<ClaimCandidate> = candidates
        .iter()
        .filter_map(|utxo| {
            let token = utxo.token.as_ref()?;
            if token.category != claim_category {
                return None;
            }
            let nft = token.nft.as_ref()?;
            if nft.capability != Capability::Immutable {
                return None;
            }
            match commitment::decode(&nft.commitment) {
                Ok((amount, min_age)) => Some(ClaimCandidate {
                    utxo: utxo.clone(),
                    commitment: Commitment::new(amount, min_age),
                }),
                Err(e) => {
                    warn!(outpoint = %utxo.outpoint(), error = %e, "Skipping claim NFT with bad commitment");
                    None
                }
            }
        })
        .collect();
    claims.sort_by_key(|claim| claim.utxo.outpoint());
    claims
}

/// Smallest token-free UTXO worth at least `required` satoshis
pub fn select_funding_utxo(candidates: &[Utxo], required: u64) -> Result<Utxo> {
    let plain = candidates.iter().filter(|utxo| utxo.is_plain());

    let best = plain
        .clone()
        .filter(|utxo| utxo.satoshis >= required)
        .min_by_key(|utxo| (utxo.satoshis, utxo.outpoint()));

    match best {
        Some(utxo) => {
            debug!(outpoint = %utxo.outpoint(), satoshis = utxo.satoshis, "Selected funding UTXO");
            Ok(utxo.clone())
        }
        None => Err(BridgeError::InsufficientFunding {
            available: plain.map(|utxo| utxo.satoshis).max().unwrap_or(0),
            required,
        }),
    }
}

/// Largest fungible reserve-category UTXO the user holds
pub fn select_deposit_utxo(candidates: &[Utxo], reserve_category: TokenCategory) -> Result<Utxo> {
    candidates
        .iter()
        .filter(|utxo| {
            utxo.token
                .as_ref()
                .is_some_and(|t| t.category == reserve_category && t.nft.is_none() && t.amount > 0)
        })
        .max_by_key(|utxo| {
            (
                utxo.token.as_ref().map(|t| t.amount).unwrap_or(0),
                std::cmp::Reverse(utxo.outpoint()),
            )
        })
        .cloned()
        .ok_or_else(|| BridgeError::CategoryMismatch {
            role: InputRole::Deposit,
            reason: format!("no fungible {} tokens to deposit", reserve_category),
        })
}
