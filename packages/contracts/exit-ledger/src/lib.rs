//! CashBridge Exit Ledger - account-chain side of the CashToken bridge
//!
//! # Deposit Flow (toward the UTXO side)
//! 1. User deposits the bridged asset with destination data (native funds
//!    or a CW20 `Send`)
//! 2. The fee is forwarded to the fee collector; the rest joins the reserve
//! 3. A `bridge` event carries the destination and `amount_after_fee`
//!
//! # Exit Flow (from the UTXO side)
//! 1. User calls `StartExit { amount, data }`; `exit_id = keccak256(data)`
//!    must be new, which is the only replay protection
//! 2. After `min_timelock` blocks, `ProcessExit { exit_id, signature }`
//!    checks the authorizer's signature over
//!    `eth_signed(keccak256(exit_id || amount || caller))`
//! 3. The record is marked processed and the amount released to the user

pub mod contract;
pub mod error;
mod execute;
pub mod fee_manager;
pub mod hash;
pub mod msg;
mod query;
pub mod state;

pub use crate::error::ContractError;
pub use crate::fee_manager::{calculate_fee, MAX_FEE_BPS};
pub use crate::hash::{compute_exit_id, compute_exit_message_hash, keccak256};
