//! Testing Utilities Module
//!
//! In-memory collaborators and fixtures for exercising the claim/exit flow
//! without a node or wallet.
//!
//! ## Submodules
//!
//! - `fixtures` - Registry, contract, user address and scenario UTXOs
//! - `mock_chain` - `ChainQuery` backed by in-memory UTXO and age tables
//! - `mock_signer` - `RemoteSigner` that signs, cancels, rejects or tampers

pub mod fixtures;
pub mod mock_chain;
pub mod mock_signer;

pub use fixtures::*;
pub use mock_chain::*;
pub use mock_signer::*;
