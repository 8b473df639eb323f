//! CashBridge-RS: Shared library for the CashToken bridge
//!
//! This crate holds everything the claimer CLI and the exit ledger need to
//! agree on:
//!
//! - **Token Encoding** - CashToken prefix, transaction wire format, txids
//! - **Address Codec** - CashAddr encode/decode and locking bytecode
//! - **Claim Commitments** - `amount || min_age` NFT commitment layout
//! - **Covenant Model** - Reserve/claim categories and the contract's rules
//! - **Builders** - Claim and exit transaction construction
//! - **Signing Handoff** - Envelopes for remote wallets and result checks
//! - **Exit Hashes** - Keccak exit ids and authorization message hashes
//! - **Testing Module** - In-memory chain and signer for flow tests
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! cashbridge-rs = { path = "../cashbridge-rs" }
//! ```
//!
//! ## Feature Flags
//!
//! - `evm` - Exit authorization signing with alloy (default)
//! - `testing` - Mock collaborators and fixtures
//! - `full` - Enable all features

// Core modules (always available)
pub mod address_codec;
pub mod builder;
pub mod category;
pub mod commitment;
pub mod covenant;
pub mod error;
pub mod flow;
pub mod hash;
pub mod redact;
pub mod script;
pub mod selection;
pub mod signing;
pub mod transaction;
pub mod types;

#[cfg(feature = "evm")]
pub mod authorization;

// Testing utilities (feature-gated)
#[cfg(feature = "testing")]
pub mod testing;

// Re-export commonly used items at the crate root
pub use address_codec::{AddressKind, CashAddress, MAINNET_PREFIX};
pub use builder::{
    check_maturity, BridgeAction, OutputCosts, TransactionBuilder, UnsignedTransaction,
    DUST_LIMIT,
};
pub use category::CategoryRegistry;
pub use commitment::Commitment;
pub use covenant::{BridgeContract, CovenantFunction, RequirementSet};
pub use error::{BridgeError, InputRole, Result};
pub use flow::{BridgeFlow, ChainQuery, PreparedTransaction, RemoteSigner, SigningError};
pub use hash::{
    bytes32_to_hex, compute_exit_id, compute_exit_message_hash, keccak256,
    to_eth_signed_message_hash,
};
pub use signing::{prepare_for_remote_signing, verify_signed, InputMetadata, SigningEnvelope};
pub use transaction::{decode_transaction, Transaction, TxInput, TxOutput};
pub use types::{
    Capability, ChainId, EvmAddress, ExitDestination, Nft, Outpoint, TokenCategory, TokenData,
    TxId, Utxo,
};

#[cfg(feature = "evm")]
pub use authorization::{recover_authorizer, ExitAuthorization, ExitAuthorizer};
