//! State definitions for the exit ledger contract
//!
//! The `EXITS` table is the only durable record this contract owns; it is
//! keyed by the 32-byte exit id and entries are never deleted.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Uint128};
use cw_storage_plus::{Item, Map};

// ============================================================================
// Core Configuration
// ============================================================================

/// Token the ledger accepts and releases
#[cw_serde]
pub enum Asset {
    Native { denom: String },
    Cw20 { contract_addr: Addr },
}

impl Asset {
    pub fn label(&self) -> String {
        match self {
            Asset::Native { denom } => denom.clone(),
            Asset::Cw20 { contract_addr } => contract_addr.to_string(),
        }
    }
}

/// Contract configuration
#[cw_serde]
pub struct Config {
    /// Admin address for contract management
    pub admin: Addr,
    pub asset: Asset,
    /// Deposit fee in basis points (e.g., 30 = 0.3%)
    pub fee_bps: u64,
    /// Fee collector address
    pub fee_collector: Addr,
    /// EVM-style address whose signatures release exits
    pub authorizer: [u8; 20],
    /// Blocks an exit must wait between start and process
    pub min_timelock: u64,
}

/// An exit request, created by `StartExit` and settled by `ProcessExit`
#[cw_serde]
pub struct ExitRecord {
    pub user: Addr,
    pub amount: Uint128,
    pub data: String,
    /// Block height at `StartExit`
    pub block_number: u64,
    pub processed: bool,
    /// Authorizer signature, attached on processing
    pub signature: Option<Binary>,
}

#[cw_serde]
#[derive(Default)]
pub struct Stats {
    pub total_deposits: u64,
    pub total_deposited: Uint128,
    pub total_fees_collected: Uint128,
    pub total_exits_started: u64,
    pub total_exits_processed: u64,
    pub total_released: Uint128,
}

// ============================================================================
// Constants
// ============================================================================

/// Contract name for cw2 migration info
pub const CONTRACT_NAME: &str = "crates.io:cashbridge-exit-ledger";

/// Contract version for cw2 migration info
pub const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Storage
// ============================================================================

pub const CONFIG: Item<Config> = Item::new("config");

pub const STATS: Item<Stats> = Item::new("stats");

/// Bridgeable value held for exits (deposits net of fees, minus releases)
pub const RESERVE: Item<Uint128> = Item::new("reserve");

/// Exit records
/// Key: 32-byte exit id as &[u8], Value: ExitRecord
pub const EXITS: Map<&[u8], ExitRecord> = Map::new("exits");
