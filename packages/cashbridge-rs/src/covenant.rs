//! Covenant model
//!
//! The Issuer and Bridge contracts live on-chain as compiled script; the
//! network rejects any transaction that breaks their rules. This module
//! restates those rules as data (a [`RequirementSet`] of tagged
//! [`Requirement`]s) so that every transaction the builder emits can be
//! checked locally before it is handed to a signer.
//!
//! ## Issuer.issue(amount)
//!
//! | Index | Input                        | Output                                  |
//! |-------|------------------------------|-----------------------------------------|
//! | 0     | issuer minting NFT (active)  | minting NFT back to the issuer          |
//! | 1     | owner funding                | new immutable claim NFT, commitment set |
//!
//! ## Bridge.claim()
//!
//! | Index | Input                      | Output                                     |
//! |-------|----------------------------|--------------------------------------------|
//! | 0     | reserve (active)           | reserve, `amount - claimed`                |
//! | 1     | matured claim NFT          | `claimed` reserve tokens to the NFT owner  |
//! | 2     | funding                    | plain change (burns the claim NFT)         |
//!
//! ## Bridge.exit()
//!
//! | Index | Input                      | Output                                     |
//! |-------|----------------------------|--------------------------------------------|
//! | 0     | reserve (active)           | reserve, `amount + deposit`                |
//! | 1     | reserve-category deposit   | `OP_RETURN <chain id> <account>`           |
//! | 2     | funding                    | plain change                               |

use std::fmt;

use tracing::debug;

use crate::category::{strip_capability, CategoryRegistry};
use crate::commitment::{self, Commitment};
use crate::error::{BridgeError, Result};
use crate::hash::hash256;
use crate::script;
use crate::transaction::{Transaction, TxOutput};
use crate::types::{Capability, ChainId, EvmAddress, ExitDestination, TokenCategory};

// ============================================================================
// Relative Lock-Time
// ============================================================================

/// Sequence bit that disables relative lock-time
const SEQUENCE_DISABLE_FLAG: u32 = 1 << 31;

/// Sequence bit that selects time-based (512s units) instead of block-based
const SEQUENCE_TYPE_FLAG: u32 = 1 << 22;

const SEQUENCE_MASK: u32 = 0x0000_ffff;

/// Sequence number requiring the spent output to be `min_age` blocks old
pub fn relative_block_lock(min_age: u64) -> Result<u32> {
    if min_age > SEQUENCE_MASK as u64 {
        return Err(BridgeError::CovenantViolation(format!(
            "min age {} exceeds the largest relative lock ({})",
            min_age, SEQUENCE_MASK
        )));
    }
    Ok(min_age as u32)
}

/// Block-based relative lock a sequence number enforces, if any
pub fn sequence_block_lock(sequence: u32) -> Option<u64> {
    if sequence & (SEQUENCE_DISABLE_FLAG | SEQUENCE_TYPE_FLAG) != 0 {
        return None;
    }
    Some((sequence & SEQUENCE_MASK) as u64)
}

// ============================================================================
// Bridge Contract
// ============================================================================

/// Function a contract input is unlocked with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovenantFunction {
    Claim,
    Exit,
}

impl CovenantFunction {
    pub fn selector(self) -> u8 {
        match self {
            CovenantFunction::Claim => 0,
            CovenantFunction::Exit => 1,
        }
    }

    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(CovenantFunction::Claim),
            1 => Some(CovenantFunction::Exit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CovenantFunction::Claim => "claim",
            CovenantFunction::Exit => "exit",
        }
    }
}

/// The compiled Bridge covenant, locked as P2SH32
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeContract {
    redeem_script: Vec<u8>,
}

impl BridgeContract {
    pub fn new(redeem_script: Vec<u8>) -> Result<Self> {
        if redeem_script.is_empty() {
            return Err(BridgeError::Decoding("empty bridge redeem script".to_string()));
        }
        Ok(Self { redeem_script })
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| BridgeError::Decoding(format!("redeem script is not hex: {}", e)))?;
        Self::new(bytes)
    }

    pub fn redeem_script(&self) -> &[u8] {
        &self.redeem_script
    }

    pub fn script_hash(&self) -> [u8; 32] {
        hash256(&self.redeem_script)
    }

    /// `OP_HASH256 <hash256(redeem script)> OP_EQUAL`
    pub fn locking_bytecode(&self) -> Vec<u8> {
        script::p2sh32(&self.script_hash())
    }

    /// `<selector> <redeem script>`
    pub fn unlocking_bytecode(&self, function: CovenantFunction) -> Vec<u8> {
        let mut out = script::push_number(function.selector());
        out.extend(script::push_data(&self.redeem_script));
        out
    }

    /// Which function an unlocking bytecode invokes, if it unlocks this contract
    pub fn parse_unlocking(&self, unlocking: &[u8]) -> Option<CovenantFunction> {
        let elements = script::parse(unlocking).ok()?;
        let [selector, redeem] = elements.as_slice() else {
            return None;
        };
        if *redeem != script::ScriptElement::Push(self.redeem_script.as_slice()) {
            return None;
        }
        match selector {
            script::ScriptElement::Op(script::OP_0) => CovenantFunction::from_selector(0),
            script::ScriptElement::Op(op) if (script::OP_1..=script::OP_16).contains(op) => {
                CovenantFunction::from_selector(op - script::OP_1 + 1)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Exit Data Output
// ============================================================================

/// `OP_RETURN <chain id (4)> <account (20)>`
pub fn exit_data_bytecode(destination: &ExitDestination) -> Vec<u8> {
    script::op_return(&[&destination.chain.as_bytes()[..], &destination.account.as_bytes()[..]])
}

/// Parse an exit data output back into its destination
pub fn parse_exit_data(bytecode: &[u8]) -> Option<ExitDestination> {
    let pushes = script::op_return_payload(bytecode)?;
    let [chain, account] = pushes.as_slice() else {
        return None;
    };
    let chain: [u8; 4] = (*chain).try_into().ok()?;
    let account: [u8; 20] = (*account).try_into().ok()?;
    Some(ExitDestination {
        chain: ChainId(chain),
        account: EvmAddress(account),
    })
}

// ============================================================================
// Requirements
// ============================================================================

/// One rule of a covenant function, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// The contract must be evaluated as this input
    ActiveInput { input: usize },
    /// Exact number of outputs
    OutputCount { count: usize },
    /// Output pays back to the same locking bytecode as the spent input
    LockingPreserved { input: usize, output: usize },
    /// Output keeps the input's category after stripping capability
    CategoryPreserved { input: usize, output: usize },
    /// Spent input carries this base category
    InputCategory { input: usize, category: TokenCategory },
    /// Output carries this base category
    OutputCategory { output: usize, category: TokenCategory },
    /// Spent input is an NFT with this capability
    InputCapability { input: usize, capability: Capability },
    /// Output is an NFT with this capability
    OutputCapability { output: usize, capability: Capability },
    /// Newly issued NFT carries exactly this commitment
    NftCommitment { output: usize, commitment: [u8; 16] },
    /// Reserve output amount equals reserve input amount minus the claimed amount
    ReserveDecreasedByClaim { reserve: usize, claim_input: usize },
    /// Reserve output amount equals reserve input amount plus the deposit amount
    ReserveIncreasedByDeposit { reserve: usize, deposit_input: usize },
    /// Claim input's sequence enforces at least the committed minimum age
    ClaimMatured { claim_input: usize },
    /// Output pays the claimed reserve tokens to the claim NFT's owner
    PayoutToClaimOwner { output: usize, claim_input: usize, reserve: usize },
    /// Output is a zero-value `OP_RETURN <chain id> <account>`
    ExitDataOutput { output: usize },
    /// Output carries no token data
    PlainOutput { output: usize },
    /// Owner signature over the transaction; enforced by the network only
    OwnerSignature { owner_pkh: [u8; 20] },
}

impl Requirement {
    /// Whether this requirement can only be checked by the network
    pub fn is_deferred(&self) -> bool {
        matches!(self, Requirement::OwnerSignature { .. })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::ActiveInput { input } => write!(f, "active input is {}", input),
            Requirement::OutputCount { count } => write!(f, "exactly {} outputs", count),
            Requirement::LockingPreserved { input, output } => {
                write!(f, "output {} locks like input {}", output, input)
            }
            Requirement::CategoryPreserved { input, output } => {
                write!(f, "output {} keeps category of input {}", output, input)
            }
            Requirement::InputCategory { input, category } => {
                write!(f, "input {} has category {}", input, category)
            }
            Requirement::OutputCategory { output, category } => {
                write!(f, "output {} has category {}", output, category)
            }
            Requirement::InputCapability { input, capability } => {
                write!(f, "input {} is a {} NFT", input, capability)
            }
            Requirement::OutputCapability { output, capability } => {
                write!(f, "output {} is a {} NFT", output, capability)
            }
            Requirement::NftCommitment { output, commitment } => {
                write!(f, "output {} commits to {}", output, hex::encode(commitment))
            }
            Requirement::ReserveDecreasedByClaim {
                reserve,
                claim_input,
            } => write!(
                f,
                "reserve {} decreases by the amount committed in input {}",
                reserve, claim_input
            ),
            Requirement::ReserveIncreasedByDeposit {
                reserve,
                deposit_input,
            } => write!(
                f,
                "reserve {} increases by the deposit in input {}",
                reserve, deposit_input
            ),
            Requirement::ClaimMatured { claim_input } => {
                write!(f, "input {} is at least its committed min age", claim_input)
            }
            Requirement::PayoutToClaimOwner {
                output, claim_input, ..
            } => write!(f, "output {} pays the owner of input {}", output, claim_input),
            Requirement::ExitDataOutput { output } => {
                write!(f, "output {} carries exit destination data", output)
            }
            Requirement::PlainOutput { output } => write!(f, "output {} carries no tokens", output),
            Requirement::OwnerSignature { owner_pkh } => {
                write!(f, "signed by owner {}", hex::encode(owner_pkh))
            }
        }
    }
}

/// A requirement the transaction failed, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub requirement: Requirement,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.requirement, self.reason)
    }
}

/// Transaction under evaluation plus the outputs its inputs spend
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    pub transaction: &'a Transaction,
    /// Spent outputs, one per input, in input order
    pub source_outputs: &'a [TxOutput],
    pub active_input: usize,
}

/// Result of evaluating a requirement set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub violations: Vec<Violation>,
    /// Requirements only the network can check; never counted as passing
    pub deferred: Vec<Requirement>,
}

impl Evaluation {
    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }
}

// ============================================================================
// Requirement Sets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementSet {
    pub name: &'static str,
    pub requirements: Vec<Requirement>,
}

impl RequirementSet {
    /// Issuer.issue: mint one immutable claim NFT committing to `amount`/`min_age`
    pub fn issue(
        claim_category: TokenCategory,
        amount: u64,
        min_age: u64,
        owner_pkh: [u8; 20],
    ) -> Self {
        Self {
            name: "issue",
            requirements: vec![
                Requirement::ActiveInput { input: 0 },
                Requirement::InputCategory {
                    input: 0,
                    category: claim_category,
                },
                Requirement::CategoryPreserved { input: 0, output: 0 },
                Requirement::OutputCapability {
                    output: 0,
                    capability: Capability::Minting,
                },
                Requirement::LockingPreserved { input: 0, output: 0 },
                Requirement::OutputCategory {
                    output: 1,
                    category: claim_category,
                },
                Requirement::OutputCapability {
                    output: 1,
                    capability: Capability::Immutable,
                },
                Requirement::NftCommitment {
                    output: 1,
                    commitment: Commitment::new(amount, min_age).to_bytes(),
                },
                Requirement::OwnerSignature { owner_pkh },
            ],
        }
    }

    /// Bridge.claim
    pub fn claim(registry: &CategoryRegistry) -> Self {
        Self {
            name: "claim",
            requirements: vec![
                Requirement::ActiveInput { input: 0 },
                Requirement::OutputCount { count: 3 },
                Requirement::InputCategory {
                    input: 0,
                    category: registry.reserve_category(),
                },
                Requirement::LockingPreserved { input: 0, output: 0 },
                Requirement::CategoryPreserved { input: 0, output: 0 },
                Requirement::InputCategory {
                    input: 1,
                    category: registry.claim_category(),
                },
                Requirement::InputCapability {
                    input: 1,
                    capability: Capability::Immutable,
                },
                Requirement::ReserveDecreasedByClaim {
                    reserve: 0,
                    claim_input: 1,
                },
                Requirement::ClaimMatured { claim_input: 1 },
                Requirement::PayoutToClaimOwner {
                    output: 1,
                    claim_input: 1,
                    reserve: 0,
                },
                Requirement::PlainOutput { output: 2 },
            ],
        }
    }

    /// Bridge.exit
    pub fn exit(registry: &CategoryRegistry) -> Self {
        Self {
            name: "exit",
            requirements: vec![
                Requirement::ActiveInput { input: 0 },
                Requirement::OutputCount { count: 3 },
                Requirement::InputCategory {
                    input: 0,
                    category: registry.reserve_category(),
                },
                Requirement::LockingPreserved { input: 0, output: 0 },
                Requirement::CategoryPreserved { input: 0, output: 0 },
                Requirement::InputCategory {
                    input: 1,
                    category: registry.reserve_category(),
                },
                Requirement::ReserveIncreasedByDeposit {
                    reserve: 0,
                    deposit_input: 1,
                },
                Requirement::ExitDataOutput { output: 1 },
                Requirement::PlainOutput { output: 2 },
            ],
        }
    }

    pub fn evaluate(&self, ctx: &TxContext<'_>) -> Evaluation {
        let mut evaluation = Evaluation::default();
        for requirement in &self.requirements {
            if requirement.is_deferred() {
                evaluation.deferred.push(requirement.clone());
                continue;
            }
            if let Err(reason) = check(requirement, ctx) {
                evaluation.violations.push(Violation {
                    requirement: requirement.clone(),
                    reason,
                });
            }
        }
        debug!(
            function = self.name,
            violations = evaluation.violations.len(),
            deferred = evaluation.deferred.len(),
            "Evaluated covenant requirements"
        );
        evaluation
    }

    /// Evaluate and turn the first violation into an error
    pub fn enforce(&self, ctx: &TxContext<'_>) -> Result<()> {
        let evaluation = self.evaluate(ctx);
        match evaluation.violations.first() {
            None => Ok(()),
            Some(violation) => Err(BridgeError::CovenantViolation(format!(
                "{}: {}",
                self.name, violation
            ))),
        }
    }
}

// ============================================================================
// Checks
// ============================================================================

type CheckResult = std::result::Result<(), String>;

fn source<'a>(ctx: &TxContext<'a>, input: usize) -> std::result::Result<&'a TxOutput, String> {
    if input >= ctx.transaction.inputs.len() {
        return Err(format!("input {} does not exist", input));
    }
    ctx.source_outputs
        .get(input)
        .ok_or_else(|| format!("no source output for input {}", input))
}

fn output<'a>(ctx: &TxContext<'a>, index: usize) -> std::result::Result<&'a TxOutput, String> {
    ctx.transaction
        .outputs
        .get(index)
        .ok_or_else(|| format!("output {} does not exist", index))
}

fn base_category(out: &TxOutput, what: &str) -> std::result::Result<TokenCategory, String> {
    let token = out
        .token
        .as_ref()
        .ok_or_else(|| format!("{} carries no token", what))?;
    strip_capability(&token.category_field()).map_err(|e| e.to_string())
}

fn capability(out: &TxOutput, what: &str) -> std::result::Result<Capability, String> {
    out.token
        .as_ref()
        .and_then(|t| t.capability())
        .ok_or_else(|| format!("{} is not an NFT", what))
}

fn fungible_amount(out: &TxOutput, what: &str) -> std::result::Result<u64, String> {
    out.token
        .as_ref()
        .map(|t| t.amount)
        .ok_or_else(|| format!("{} carries no token", what))
}

fn claim_commitment(ctx: &TxContext<'_>, claim_input: usize) -> std::result::Result<Commitment, String> {
    let claim = source(ctx, claim_input)?;
    let nft = claim
        .token
        .as_ref()
        .and_then(|t| t.nft.as_ref())
        .ok_or_else(|| format!("input {} is not an NFT", claim_input))?;
    let (amount, min_age) = commitment::decode(&nft.commitment).map_err(|e| e.to_string())?;
    Ok(Commitment::new(amount, min_age))
}

fn check(requirement: &Requirement, ctx: &TxContext<'_>) -> CheckResult {
    match requirement {
        Requirement::ActiveInput { input } => {
            if ctx.active_input != *input {
                return Err(format!("contract evaluated as input {}", ctx.active_input));
            }
            source(ctx, *input).map(|_| ())
        }
        Requirement::OutputCount { count } => {
            let actual = ctx.transaction.outputs.len();
            if actual != *count {
                return Err(format!("transaction has {} outputs", actual));
            }
            Ok(())
        }
        Requirement::LockingPreserved { input, output: index } => {
            let spent = source(ctx, *input)?;
            let out = output(ctx, *index)?;
            if spent.locking_bytecode != out.locking_bytecode {
                return Err("locking bytecode differs".to_string());
            }
            Ok(())
        }
        Requirement::CategoryPreserved { input, output: index } => {
            let spent = base_category(source(ctx, *input)?, "input")?;
            let out = base_category(output(ctx, *index)?, "output")?;
            if spent != out {
                return Err(format!("category changed from {} to {}", spent, out));
            }
            Ok(())
        }
        Requirement::InputCategory { input, category } => {
            let actual = base_category(source(ctx, *input)?, "input")?;
            if actual != *category {
                return Err(format!("found category {}", actual));
            }
            Ok(())
        }
        Requirement::OutputCategory {
            output: index,
            category,
        } => {
            let actual = base_category(output(ctx, *index)?, "output")?;
            if actual != *category {
                return Err(format!("found category {}", actual));
            }
            Ok(())
        }
        Requirement::InputCapability {
            input,
            capability: expected,
        } => {
            let actual = capability(source(ctx, *input)?, "input")?;
            if actual != *expected {
                return Err(format!("found {} capability", actual));
            }
            Ok(())
        }
        Requirement::OutputCapability {
            output: index,
            capability: expected,
        } => {
            let actual = capability(output(ctx, *index)?, "output")?;
            if actual != *expected {
                return Err(format!("found {} capability", actual));
            }
            Ok(())
        }
        Requirement::NftCommitment {
            output: index,
            commitment,
        } => {
            let nft = output(ctx, *index)?
                .token
                .as_ref()
                .and_then(|t| t.nft.as_ref())
                .ok_or_else(|| "output is not an NFT".to_string())?;
            if nft.commitment.as_slice() != commitment.as_slice() {
                return Err(format!("found commitment {}", hex::encode(&nft.commitment)));
            }
            Ok(())
        }
        Requirement::ReserveDecreasedByClaim {
            reserve,
            claim_input,
        } => {
            let claimed = claim_commitment(ctx, *claim_input)?.amount;
            let amount_in = fungible_amount(source(ctx, *reserve)?, "reserve input")?;
            let amount_out = fungible_amount(output(ctx, *reserve)?, "reserve output")?;
            let expected = amount_in
                .checked_sub(claimed)
                .ok_or_else(|| format!("claim of {} exceeds reserve {}", claimed, amount_in))?;
            if amount_out != expected {
                return Err(format!("reserve output holds {}, expected {}", amount_out, expected));
            }
            Ok(())
        }
        Requirement::ReserveIncreasedByDeposit {
            reserve,
            deposit_input,
        } => {
            let deposit = fungible_amount(source(ctx, *deposit_input)?, "deposit input")?;
            let amount_in = fungible_amount(source(ctx, *reserve)?, "reserve input")?;
            let amount_out = fungible_amount(output(ctx, *reserve)?, "reserve output")?;
            let expected = amount_in
                .checked_add(deposit)
                .ok_or_else(|| "reserve amount overflows".to_string())?;
            if amount_out != expected {
                return Err(format!("reserve output holds {}, expected {}", amount_out, expected));
            }
            Ok(())
        }
        Requirement::ClaimMatured { claim_input } => {
            let min_age = claim_commitment(ctx, *claim_input)?.min_age;
            let sequence = ctx.transaction.inputs[*claim_input].sequence;
            match sequence_block_lock(sequence) {
                Some(lock) if lock >= min_age => Ok(()),
                Some(lock) => Err(format!("sequence locks {} blocks, need {}", lock, min_age)),
                None => Err(format!(
                    "sequence {:#010x} does not enforce a block-based age",
                    sequence
                )),
            }
        }
        Requirement::PayoutToClaimOwner {
            output: index,
            claim_input,
            reserve,
        } => {
            let claimed = claim_commitment(ctx, *claim_input)?.amount;
            let owner = &source(ctx, *claim_input)?.locking_bytecode;
            let reserve_category = base_category(source(ctx, *reserve)?, "reserve input")?;
            let out = output(ctx, *index)?;

            if &out.locking_bytecode != owner {
                return Err("payout does not go to the claim NFT owner".to_string());
            }
            let token = out
                .token
                .as_ref()
                .ok_or_else(|| "payout carries no token".to_string())?;
            if token.nft.is_some() || token.category != reserve_category {
                return Err("payout must carry only reserve-category fungible tokens".to_string());
            }
            if token.amount != claimed {
                return Err(format!("payout holds {}, claim is {}", token.amount, claimed));
            }
            Ok(())
        }
        Requirement::ExitDataOutput { output: index } => {
            let out = output(ctx, *index)?;
            if out.value != 0 || out.token.is_some() {
                return Err("data output must carry no value and no tokens".to_string());
            }
            parse_exit_data(&out.locking_bytecode)
                .map(|_| ())
                .ok_or_else(|| "not an OP_RETURN <chain id> <account> output".to_string())
        }
        Requirement::PlainOutput { output: index } => {
            if output(ctx, *index)?.token.is_some() {
                return Err("output carries token data".to_string());
            }
            Ok(())
        }
        Requirement::OwnerSignature { .. } => Err("deferred to the network".to_string()),
    }
}
