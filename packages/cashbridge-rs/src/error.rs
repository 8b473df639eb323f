//! Error types for the bridge core
//!
//! Every variant is a local validation failure surfaced synchronously to the
//! caller. Nothing here is retried internally: each one means the inputs
//! (a UTXO snapshot, an address, a signed transaction) must be refreshed or
//! corrected before trying again.

use std::fmt;

use thiserror::Error;

/// Which input of a bridge transaction an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Reserve,
    Claim,
    Deposit,
    Funding,
}

impl InputRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputRole::Reserve => "reserve",
            InputRole::Claim => "claim",
            InputRole::Deposit => "deposit",
            InputRole::Funding => "funding",
        }
    }
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ========================================================================
    // Codec Errors
    // ========================================================================
    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // ========================================================================
    // Builder Errors
    // ========================================================================
    #[error("Category mismatch on {role} input: {reason}")]
    CategoryMismatch { role: InputRole, reason: String },

    #[error("Insufficient reserve: reserve holds {available}, claim needs {requested}")]
    InsufficientReserve { available: u64, requested: u64 },

    #[error("Insufficient funding: have {available} sats, need {required} sats")]
    InsufficientFunding { available: u64, required: u64 },

    #[error("Claim not mature: input age {age} is below minimum age {min_age}")]
    Immature { min_age: u64, age: u64 },

    #[error("Covenant violation: {0}")]
    CovenantViolation(String),

    // ========================================================================
    // Selection Errors
    // ========================================================================
    #[error("Reserve unavailable: {0}")]
    ReserveUnavailable(String),

    #[error("Claim NFT not found: {0}")]
    ClaimNotFound(String),

    // ========================================================================
    // Signing Handoff Errors
    // ========================================================================
    #[error("Invalid signing target at input {index}: {reason}")]
    InvalidSigningTarget { index: usize, reason: String },

    #[error("Signed transaction does not match the built transaction: {0}")]
    SignatureMismatch(String),

    #[error("Signing request cancelled")]
    SigningCancelled,

    #[error("Exit authorization failed: {0}")]
    Authorization(String),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
