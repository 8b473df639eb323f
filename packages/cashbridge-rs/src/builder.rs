//! Claim and exit transaction assembly
//!
//! Both builders are pure: given the same UTXOs they emit byte-identical
//! transactions, so rebuilding after a cancelled signing request is always
//! safe. Input and output order is part of the covenant protocol.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address_codec::CashAddress;
use crate::category::{strip_capability, CategoryRegistry};
use crate::commitment::Commitment;
use crate::covenant::{
    exit_data_bytecode, relative_block_lock, BridgeContract, CovenantFunction, RequirementSet,
    TxContext,
};
use crate::error::{BridgeError, InputRole, Result};
use crate::transaction::{Transaction, TxInput, TxOutput, MAX_TOKEN_AMOUNT, SEQUENCE_FINAL};
use crate::types::{Capability, ExitDestination, TokenCategory, TokenData, Utxo};

/// Smallest plain output the network relays
pub const DUST_LIMIT: u64 = 546;

/// Version 2 enables relative lock-time (BIP68) on inputs
pub const TX_VERSION: u32 = 2;

/// Inputs a remote wallet must unlock in both claim and exit transactions
pub const REMOTE_INPUTS: [usize; 2] = [1, 2];

/// Fixed per-transaction satoshi costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputCosts {
    /// Budget withheld from the funding input (network fee)
    pub dust_output_cost: u64,
    /// Satoshis placed on the token payout output
    pub primary_output_cost: u64,
}

impl Default for OutputCosts {
    fn default() -> Self {
        Self {
            dust_output_cost: 1000,
            primary_output_cost: 1000,
        }
    }
}

/// What a built transaction does; drives the signer prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeAction {
    Claim,
    Exit,
}

impl BridgeAction {
    pub fn prompt(&self) -> &'static str {
        match self {
            BridgeAction::Claim => "Claim",
            BridgeAction::Exit => "Exit",
        }
    }
}

/// A built transaction whose remote inputs are still unlocked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub action: BridgeAction,
    pub transaction: Transaction,
    pub encoded: Vec<u8>,
    /// The UTXO each input spends, in input order
    pub source_utxos: Vec<Utxo>,
    /// Input indexes an external signer must unlock
    pub remote_inputs: Vec<usize>,
}

/// Reject a claim whose NFT has not reached its committed age
pub fn check_maturity(claim: &Utxo, age: u64) -> Result<Commitment> {
    let commitment = claim_commitment(claim)?;
    if age < commitment.min_age {
        return Err(BridgeError::Immature {
            min_age: commitment.min_age,
            age,
        });
    }
    Ok(commitment)
}

fn claim_commitment(claim: &Utxo) -> Result<Commitment> {
    let nft = claim
        .token
        .as_ref()
        .and_then(|t| t.nft.as_ref())
        .ok_or_else(|| BridgeError::CategoryMismatch {
            role: InputRole::Claim,
            reason: "claim input is not an NFT".to_string(),
        })?;
    Commitment::from_bytes(&nft.commitment)
}

fn token_of(utxo: &Utxo, role: InputRole) -> Result<&TokenData> {
    utxo.token.as_ref().ok_or_else(|| BridgeError::CategoryMismatch {
        role,
        reason: format!("{} carries no token", utxo.outpoint()),
    })
}

fn expect_category(token: &TokenData, expected: TokenCategory, role: InputRole) -> Result<()> {
    let actual = strip_capability(&token.category_field())?;
    if actual != expected {
        return Err(BridgeError::CategoryMismatch {
            role,
            reason: format!("expected category {}, found {}", expected, actual),
        });
    }
    Ok(())
}

fn expect_plain(utxo: &Utxo) -> Result<()> {
    if !utxo.is_plain() {
        return Err(BridgeError::CategoryMismatch {
            role: InputRole::Funding,
            reason: format!("funding input {} carries tokens", utxo.outpoint()),
        });
    }
    Ok(())
}

fn input(utxo: &Utxo, unlocking_bytecode: Vec<u8>, sequence: u32) -> TxInput {
    TxInput {
        outpoint: utxo.outpoint(),
        unlocking_bytecode,
        sequence,
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    registry: CategoryRegistry,
    contract: BridgeContract,
    costs: OutputCosts,
}

impl TransactionBuilder {
    pub fn new(registry: CategoryRegistry, contract: BridgeContract, costs: OutputCosts) -> Self {
        Self {
            registry,
            contract,
            costs,
        }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub fn contract(&self) -> &BridgeContract {
        &self.contract
    }

    pub fn costs(&self) -> OutputCosts {
        self.costs
    }

    /// Satoshis a claim's funding input must hold
    ///
    /// Saturates: costs past `u64::MAX` can never be funded.
    pub fn claim_funding_required(&self) -> u64 {
        self.claim_withheld().saturating_add(DUST_LIMIT)
    }

    /// Satoshis an exit's funding and deposit inputs must hold together
    pub fn exit_funding_required(&self) -> u64 {
        self.costs.dust_output_cost.saturating_add(DUST_LIMIT)
    }

    /// Fee budget plus payout value taken from a claim's funding input
    fn claim_withheld(&self) -> u64 {
        self.costs
            .dust_output_cost
            .saturating_add(self.costs.primary_output_cost)
    }

    fn check_reserve(&self, reserve: &Utxo) -> Result<u64> {
        let token = token_of(reserve, InputRole::Reserve)?;
        expect_category(token, self.registry.reserve_category(), InputRole::Reserve)?;
        if token.nft.is_some() {
            return Err(BridgeError::CategoryMismatch {
                role: InputRole::Reserve,
                reason: "reserve output must be fungible only".to_string(),
            });
        }
        if reserve.locking_bytecode != self.contract.locking_bytecode() {
            return Err(BridgeError::CovenantViolation(format!(
                "reserve {} is not locked by the bridge contract",
                reserve.outpoint()
            )));
        }
        Ok(token.amount)
    }

    /// Build the three-output claim transaction
    ///
    /// Inputs: reserve (0), claim NFT (1), funding (2).
    /// Outputs: reserve successor (0), payout to `destination` (1), plain change (2).
    pub fn build_claim(
        &self,
        reserve: &Utxo,
        claim: &Utxo,
        funding: &Utxo,
        destination: &CashAddress,
    ) -> Result<UnsignedTransaction> {
        // 1. Categories
        let reserve_amount = self.check_reserve(reserve)?;
        let claim_token = token_of(claim, InputRole::Claim)?;
        expect_category(claim_token, self.registry.claim_category(), InputRole::Claim)?;
        if claim_token.capability() != Some(Capability::Immutable) {
            return Err(BridgeError::CategoryMismatch {
                role: InputRole::Claim,
                reason: "claim NFT must be immutable".to_string(),
            });
        }
        expect_plain(funding)?;

        // 2. Commitment
        let commitment = claim_commitment(claim)?;
        let claimed = commitment.amount;

        // 3. Reserve successor; it must keep a nonzero amount to carry the category
        let new_reserve = reserve_amount
            .checked_sub(claimed)
            .filter(|amount| *amount > 0)
            .ok_or(BridgeError::InsufficientReserve {
                available: reserve_amount,
                requested: claimed,
            })?;

        // 4. Change
        let required = self.claim_funding_required();
        let change = funding
            .satoshis
            .checked_sub(self.claim_withheld())
            .filter(|change| *change >= DUST_LIMIT)
            .ok_or(BridgeError::InsufficientFunding {
                available: funding.satoshis,
                required,
            })?;

        // 5. Outputs
        let payout_address = destination.to_token_aware();
        let payout_locking = payout_address.locking_bytecode()?;
        debug!(
            destination = %payout_address,
            claimed,
            new_reserve,
            change,
            "Assembling claim outputs"
        );

        let mut outputs = Vec::with_capacity(3);
        outputs.push(TxOutput {
            value: reserve.satoshis,
            locking_bytecode: reserve.locking_bytecode.clone(),
            token: Some(TokenData::fungible(self.registry.reserve_category(), new_reserve)),
        });
        outputs.push(TxOutput {
            value: self.costs.primary_output_cost,
            locking_bytecode: payout_locking.clone(),
            token: Some(TokenData::fungible(self.registry.reserve_category(), claimed)),
        });
        outputs.push(TxOutput {
            value: change,
            locking_bytecode: payout_locking,
            token: None,
        });

        // 6. Inputs
        let inputs = vec![
            input(
                reserve,
                self.contract.unlocking_bytecode(CovenantFunction::Claim),
                SEQUENCE_FINAL,
            ),
            input(claim, Vec::new(), relative_block_lock(commitment.min_age)?),
            input(funding, Vec::new(), SEQUENCE_FINAL),
        ];

        let transaction = Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            locktime: 0,
        };

        // 7. Remote inputs
        let unsigned = self.finish(
            BridgeAction::Claim,
            transaction,
            vec![reserve.clone(), claim.clone(), funding.clone()],
            RequirementSet::claim(&self.registry),
        )?;
        info!(
            claim = %claim.outpoint(),
            claimed,
            min_age = commitment.min_age,
            "Built claim transaction"
        );
        Ok(unsigned)
    }

    /// Build the three-output exit (deposit) transaction
    ///
    /// Inputs: reserve (0), deposit (1), funding (2).
    /// Outputs: reserve successor (0), `OP_RETURN` destination (1), plain change (2).
    pub fn build_exit(
        &self,
        reserve: &Utxo,
        deposit: &Utxo,
        funding: &Utxo,
        destination: &ExitDestination,
        change_address: &CashAddress,
    ) -> Result<UnsignedTransaction> {
        let reserve_amount = self.check_reserve(reserve)?;
        let deposit_token = token_of(deposit, InputRole::Deposit)?;
        expect_category(deposit_token, self.registry.reserve_category(), InputRole::Deposit)?;
        if deposit_token.nft.is_some() || deposit_token.amount == 0 {
            return Err(BridgeError::CategoryMismatch {
                role: InputRole::Deposit,
                reason: "deposit must be fungible reserve tokens only".to_string(),
            });
        }
        expect_plain(funding)?;

        let deposited = deposit_token.amount;
        let new_reserve = reserve_amount
            .checked_add(deposited)
            .filter(|amount| *amount <= MAX_TOKEN_AMOUNT)
            .ok_or_else(|| {
                BridgeError::Encoding(format!(
                    "reserve of {} plus deposit of {} exceeds the token amount limit",
                    reserve_amount, deposited
                ))
            })?;

        let available = funding.satoshis.saturating_add(deposit.satoshis);
        let change = available
            .checked_sub(self.costs.dust_output_cost)
            .filter(|change| *change >= DUST_LIMIT)
            .ok_or(BridgeError::InsufficientFunding {
                available,
                required: self.exit_funding_required(),
            })?;

        debug!(
            chain = %destination.chain,
            account = %destination.account,
            deposited,
            new_reserve,
            change,
            "Assembling exit outputs"
        );

        let outputs = vec![
            TxOutput {
                value: reserve.satoshis,
                locking_bytecode: reserve.locking_bytecode.clone(),
                token: Some(TokenData::fungible(self.registry.reserve_category(), new_reserve)),
            },
            TxOutput {
                value: 0,
                locking_bytecode: exit_data_bytecode(destination),
                token: None,
            },
            TxOutput {
                value: change,
                locking_bytecode: change_address.locking_bytecode()?,
                token: None,
            },
        ];

        let inputs = vec![
            input(
                reserve,
                self.contract.unlocking_bytecode(CovenantFunction::Exit),
                SEQUENCE_FINAL,
            ),
            input(deposit, Vec::new(), SEQUENCE_FINAL),
            input(funding, Vec::new(), SEQUENCE_FINAL),
        ];

        let transaction = Transaction {
            version: TX_VERSION,
            inputs,
            outputs,
            locktime: 0,
        };

        let unsigned = self.finish(
            BridgeAction::Exit,
            transaction,
            vec![reserve.clone(), deposit.clone(), funding.clone()],
            RequirementSet::exit(&self.registry),
        )?;
        info!(deposit = %deposit.outpoint(), deposited, "Built exit transaction");
        Ok(unsigned)
    }

    /// Check the covenant rules and serialize
    fn finish(
        &self,
        action: BridgeAction,
        transaction: Transaction,
        source_utxos: Vec<Utxo>,
        requirements: RequirementSet,
    ) -> Result<UnsignedTransaction> {
        let source_outputs: Vec<TxOutput> = source_utxos.iter().map(TxOutput::from).collect();
        requirements.enforce(&TxContext {
            transaction: &transaction,
            source_outputs: &source_outputs,
            active_input: 0,
        })?;

        let encoded = transaction.encode()?;
        Ok(UnsignedTransaction {
            action,
            transaction,
            encoded,
            source_utxos,
            remote_inputs: REMOTE_INPUTS.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_codec::{AddressKind, MAINNET_PREFIX};
    use crate::commitment;
    use crate::covenant::parse_exit_data;
    use crate::transaction::decode_transaction;
    use crate::types::{ChainId, EvmAddress, TxId};

    fn registry() -> CategoryRegistry {
        CategoryRegistry::new(TokenCategory([0xaa; 32]), TokenCategory([0xcc; 32]))
    }

    fn builder() -> TransactionBuilder {
        TransactionBuilder::new(
            registry(),
            BridgeContract::new(vec![0x51, 0x87]).unwrap(),
            OutputCosts::default(),
        )
    }

    fn user() -> CashAddress {
        CashAddress::new(MAINNET_PREFIX, AddressKind::P2pkh, false, vec![0x11; 20]).unwrap()
    }

    fn reserve(amount: u64) -> Utxo {
        Utxo {
            txid: TxId([1; 32]),
            vout: 0,
            satoshis: 1000,
            locking_bytecode: builder().contract().locking_bytecode(),
            token: Some(TokenData::fungible(registry().reserve_category(), amount)),
        }
    }

    fn claim(amount: u64, min_age: u64) -> Utxo {
        Utxo {
            txid: TxId([2; 32]),
            vout: 1,
            satoshis: 1000,
            locking_bytecode: user().locking_bytecode().unwrap(),
            token: Some(TokenData::nft(
                registry().claim_category(),
                Capability::Immutable,
                commitment::encode(amount as u128, min_age as u128).unwrap().to_vec(),
            )),
        }
    }

    fn funding(satoshis: u64) -> Utxo {
        Utxo {
            txid: TxId([3; 32]),
            vout: 2,
            satoshis,
            locking_bytecode: user().locking_bytecode().unwrap(),
            token: None,
        }
    }

    fn output_amount(tx: &Transaction, index: usize) -> u64 {
        tx.outputs[index].token.as_ref().map(|t| t.amount).unwrap_or(0)
    }

    #[test]
    fn test_build_claim_scenario_a() {
        let unsigned = builder()
            .build_claim(&reserve(10_000), &claim(1_500, 100), &funding(5_000), &user())
            .unwrap();
        let tx = &unsigned.transaction;

        assert_eq!(tx.outputs.len(), 3);
        assert_eq!(output_amount(tx, 0), 8_500);
        assert_eq!(output_amount(tx, 1), 1_500);
        assert!(tx.outputs[2].token.is_none());
        // Conservation
        assert_eq!(output_amount(tx, 0) + output_amount(tx, 1), 10_000);

        assert_eq!(tx.outputs[1].value, 1000);
        assert_eq!(tx.outputs[2].value, 5_000 - 2_000);
        assert_eq!(tx.inputs[1].sequence, 100);
        assert_eq!(unsigned.remote_inputs, vec![1, 2]);
        assert!(!tx.inputs[0].unlocking_bytecode.is_empty());
        assert!(tx.inputs[1].unlocking_bytecode.is_empty());

        assert_eq!(decode_transaction(&unsigned.encoded).unwrap(), *tx);
    }

    #[test]
    fn test_build_claim_is_deterministic() {
        let b = builder();
        let first = b
            .build_claim(&reserve(10_000), &claim(1_500, 100), &funding(5_000), &user())
            .unwrap();
        let second = b
            .build_claim(&reserve(10_000), &claim(1_500, 100), &funding(5_000), &user())
            .unwrap();
        assert_eq!(first.encoded, second.encoded);
    }

    #[test]
    fn test_build_claim_category_mismatch() {
        let mut wrong_claim = claim(1_500, 100);
        wrong_claim.token.as_mut().unwrap().category = registry().reserve_category();
        assert!(matches!(
            builder().build_claim(&reserve(10_000), &wrong_claim, &funding(5_000), &user()),
            Err(BridgeError::CategoryMismatch {
                role: InputRole::Claim,
                ..
            })
        ));

        let mut wrong_reserve = reserve(10_000);
        wrong_reserve.token.as_mut().unwrap().category = registry().claim_category();
        assert!(matches!(
            builder().build_claim(&wrong_reserve, &claim(1_500, 100), &funding(5_000), &user()),
            Err(BridgeError::CategoryMismatch {
                role: InputRole::Reserve,
                ..
            })
        ));

        let mut mutable = claim(1_500, 100);
        mutable.token.as_mut().unwrap().nft.as_mut().unwrap().capability = Capability::Mutable;
        assert!(builder()
            .build_claim(&reserve(10_000), &mutable, &funding(5_000), &user())
            .is_err());
    }

    #[test]
    fn test_build_claim_insufficient_reserve() {
        assert_eq!(
            builder().build_claim(&reserve(1_000), &claim(1_500, 100), &funding(5_000), &user()),
            Err(BridgeError::InsufficientReserve {
                available: 1_000,
                requested: 1_500
            })
        );
    }

    #[test]
    fn test_build_claim_insufficient_funding() {
        let result = builder().build_claim(&reserve(10_000), &claim(1_500, 100), &funding(2_000), &user());
        assert!(matches!(result, Err(BridgeError::InsufficientFunding { available: 2_000, .. })));
    }

    #[test]
    fn test_build_claim_reserve_cannot_drain_to_zero() {
        assert_eq!(
            builder().build_claim(&reserve(1_500), &claim(1_500, 100), &funding(5_000), &user()),
            Err(BridgeError::InsufficientReserve {
                available: 1_500,
                requested: 1_500
            })
        );
        let unsigned = builder()
            .build_claim(&reserve(1_501), &claim(1_500, 100), &funding(5_000), &user())
            .unwrap();
        assert_eq!(output_amount(&unsigned.transaction, 0), 1);
    }

    #[test]
    fn test_oversized_costs_fail_without_overflow() {
        let huge = TransactionBuilder::new(
            registry(),
            BridgeContract::new(vec![0x51, 0x87]).unwrap(),
            OutputCosts {
                dust_output_cost: u64::MAX,
                primary_output_cost: 1,
            },
        );
        assert_eq!(huge.claim_funding_required(), u64::MAX);
        assert_eq!(huge.exit_funding_required(), u64::MAX);
        assert_eq!(
            huge.build_claim(&reserve(10_000), &claim(1_500, 100), &funding(u64::MAX), &user()),
            Err(BridgeError::InsufficientFunding {
                available: u64::MAX,
                required: u64::MAX
            })
        );

        let destination = ExitDestination {
            chain: ChainId::from_u32(1),
            account: EvmAddress([0xee; 20]),
        };
        let mut deposit = claim(0, 0);
        deposit.token = Some(TokenData::fungible(registry().reserve_category(), 700));
        assert!(matches!(
            huge.build_exit(&reserve(10_000), &deposit, &funding(u64::MAX), &destination, &user()),
            Err(BridgeError::InsufficientFunding { .. })
        ));
    }

    #[test]
    fn test_build_claim_bad_commitment() {
        let mut bad = claim(1_500, 100);
        bad.token.as_mut().unwrap().nft.as_mut().unwrap().commitment = vec![1, 2, 3];
        assert!(matches!(
            builder().build_claim(&reserve(10_000), &bad, &funding(5_000), &user()),
            Err(BridgeError::Decoding(_))
        ));
    }

    #[test]
    fn test_build_claim_payout_must_match_nft_owner() {
        let stranger = CashAddress::new(MAINNET_PREFIX, AddressKind::P2pkh, false, vec![0x99; 20]).unwrap();
        assert!(matches!(
            builder().build_claim(&reserve(10_000), &claim(1_500, 100), &funding(5_000), &stranger),
            Err(BridgeError::CovenantViolation(_))
        ));
    }

    #[test]
    fn test_build_claim_rejects_foreign_reserve() {
        let mut foreign = reserve(10_000);
        foreign.locking_bytecode = user().locking_bytecode().unwrap();
        assert!(matches!(
            builder().build_claim(&foreign, &claim(1_500, 100), &funding(5_000), &user()),
            Err(BridgeError::CovenantViolation(_))
        ));
    }

    #[test]
    fn test_check_maturity_scenario_b() {
        assert_eq!(
            check_maturity(&claim(1_500, 100), 50),
            Err(BridgeError::Immature { min_age: 100, age: 50 })
        );
        assert_eq!(check_maturity(&claim(1_500, 100), 150).unwrap().amount, 1_500);
        assert!(check_maturity(&claim(1_500, 100), 100).is_ok());
    }

    #[test]
    fn test_build_exit() {
        let destination = ExitDestination {
            chain: ChainId::from_u32(1),
            account: EvmAddress([0xee; 20]),
        };
        let mut deposit = claim(0, 0);
        deposit.token = Some(TokenData::fungible(registry().reserve_category(), 700));

        let unsigned = builder()
            .build_exit(&reserve(10_000), &deposit, &funding(5_000), &destination, &user())
            .unwrap();
        let tx = &unsigned.transaction;

        assert_eq!(unsigned.action, BridgeAction::Exit);
        assert_eq!(output_amount(tx, 0), 10_700);
        assert_eq!(tx.outputs[1].value, 0);
        assert_eq!(parse_exit_data(&tx.outputs[1].locking_bytecode), Some(destination));
        assert_eq!(tx.outputs[2].value, 5_000 + 1_000 - 1_000);
        assert!(tx.inputs.iter().all(|i| i.sequence == SEQUENCE_FINAL));
    }

    #[test]
    fn test_build_exit_rejects_nft_deposit() {
        let destination = ExitDestination {
            chain: ChainId::from_u32(1),
            account: EvmAddress([0xee; 20]),
        };
        assert!(matches!(
            builder().build_exit(&reserve(10_000), &claim(1, 1), &funding(5_000), &destination, &user()),
            Err(BridgeError::CategoryMismatch {
                role: InputRole::Deposit,
                ..
            })
        ));
    }
}
