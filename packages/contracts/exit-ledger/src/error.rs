//! Error types for the exit ledger contract

use cosmwasm_std::StdError;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    // ========================================================================
    // Authorization Errors
    // ========================================================================
    #[error("Unauthorized: only admin can perform this action")]
    Unauthorized,

    #[error("Invalid authorization: signature does not recover to the authorizer")]
    InvalidAuthorization,

    // ========================================================================
    // Exit Lifecycle Errors
    // ========================================================================
    #[error("Exit already started: {exit_id}")]
    DuplicateExit { exit_id: String },

    #[error("Exit already processed: {exit_id}")]
    AlreadyProcessed { exit_id: String },

    #[error("Exit not mature: {remaining_blocks} blocks remaining")]
    Immature { remaining_blocks: u64 },

    #[error("Exit not found: {exit_id}")]
    ExitNotFound { exit_id: String },

    // ========================================================================
    // Amount & Funds Errors
    // ========================================================================
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("No funds sent")]
    NoFundsSent,

    #[error("Wrong asset: expected {expected}, got {got}")]
    WrongAsset { expected: String, got: String },

    #[error("Insufficient liquidity: reserve holds {available}, exit needs {required}")]
    InsufficientLiquidity { available: String, required: String },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid hash length: expected 32 bytes, got {got}")]
    InvalidHashLength { got: usize },

    #[error("Invalid fee: {fee_bps} bps exceeds maximum {max_bps} bps")]
    InvalidFee { fee_bps: u64, max_bps: u64 },

    #[error("Invalid address: {reason}")]
    InvalidAddress { reason: String },
}
