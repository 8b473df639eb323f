//! Message types for the exit ledger contract

use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Binary, Uint128};

use crate::state::Asset;

// ============================================================================
// Instantiate & Migrate
// ============================================================================

/// Migrate message
#[cw_serde]
pub struct MigrateMsg {}

/// Asset as given in messages, before address validation
#[cw_serde]
pub enum AssetInfo {
    Native { denom: String },
    Cw20 { contract_addr: String },
}

/// Instantiate message
#[cw_serde]
pub struct InstantiateMsg {
    /// Admin address for contract management
    pub admin: String,
    pub asset: AssetInfo,
    /// Deposit fee in basis points (at most 1000)
    pub fee_bps: u64,
    /// Fee collector address
    pub fee_collector: String,
    /// Authorizer EVM address (0x-prefixed, 20 bytes)
    pub authorizer: String,
    /// Blocks between `StartExit` and `ProcessExit`
    pub min_timelock: u64,
}

// ============================================================================
// Execute Messages
// ============================================================================

#[cw_serde]
pub enum ExecuteMsg {
    /// Deposit native tokens toward the UTXO side
    /// `data` carries the destination (e.g. a CashAddr)
    Deposit { data: String },

    /// Deposit CW20 tokens (called via CW20 send)
    Receive(cw20::Cw20ReceiveMsg),

    /// Request an exit for `amount`; `data` must be unique per exit
    StartExit { amount: Uint128, data: String },

    /// Release a matured exit with the authorizer's signature
    ProcessExit {
        /// 32-byte exit id (hex)
        exit_id: String,
        /// `r || s || v`, 65 bytes
        signature: Binary,
    },

    /// Update configuration (admin only)
    UpdateConfig {
        fee_bps: Option<u64>,
        fee_collector: Option<String>,
        authorizer: Option<String>,
        min_timelock: Option<u64>,
    },

    /// Hand admin rights to another address (admin only)
    TransferAdmin { new_admin: String },
}

/// CW20 receive hook payload
#[cw_serde]
pub enum ReceiveMsg {
    Deposit { data: String },
}

// ============================================================================
// Query Messages
// ============================================================================

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    #[returns(ConfigResponse)]
    Config {},

    #[returns(StatsResponse)]
    Stats {},

    #[returns(Option<ExitResponse>)]
    Exit { exit_id: String },

    #[returns(Option<ExitResponse>)]
    ExitByData { data: String },

    /// Exits ordered by exit id
    #[returns(ExitsResponse)]
    Exits {
        start_after: Option<String>,
        limit: Option<u32>,
    },

    #[returns(ComputeExitIdResponse)]
    ComputeExitId { data: String },

    /// The hashes an authorizer must sign for `caller` to process an exit
    #[returns(ExitMessageHashResponse)]
    ExitMessageHash {
        exit_id: String,
        amount: Uint128,
        caller: String,
    },

    #[returns(ExitStatusResponse)]
    ExitStatus { exit_id: String },
}

// ============================================================================
// Query Responses
// ============================================================================

#[cw_serde]
pub struct ConfigResponse {
    pub admin: Addr,
    pub asset: Asset,
    pub fee_bps: u64,
    pub fee_collector: Addr,
    pub authorizer: String,
    pub min_timelock: u64,
}

#[cw_serde]
pub struct StatsResponse {
    pub total_deposits: u64,
    pub total_deposited: Uint128,
    pub total_fees_collected: Uint128,
    pub total_exits_started: u64,
    pub total_exits_processed: u64,
    pub total_released: Uint128,
    pub reserve: Uint128,
}

#[cw_serde]
pub struct ExitResponse {
    pub exit_id: String,
    pub user: Addr,
    pub amount: Uint128,
    pub data: String,
    pub block_number: u64,
    pub processed: bool,
    pub signature: Option<Binary>,
}

#[cw_serde]
pub struct ExitsResponse {
    pub exits: Vec<ExitResponse>,
}

#[cw_serde]
pub struct ComputeExitIdResponse {
    pub exit_id: String,
}

#[cw_serde]
pub struct ExitMessageHashResponse {
    pub message_hash: String,
    /// `message_hash` wrapped with the signed-message prefix
    pub signed_hash: String,
}

#[cw_serde]
pub enum ExitStatus {
    Unknown,
    Started,
    Processed,
}

#[cw_serde]
pub struct ExitStatusResponse {
    pub status: ExitStatus,
    /// Blocks left before `ProcessExit` is accepted (0 once mature)
    pub remaining_blocks: u64,
}
