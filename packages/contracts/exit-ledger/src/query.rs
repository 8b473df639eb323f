//! Query handlers for the exit ledger contract.

use cosmwasm_std::{Deps, Env, Order, StdError, StdResult, Uint128};
use cw_storage_plus::Bound;

use crate::hash::{
    address_to_hex, bytes32_to_hex, compute_exit_id, compute_exit_message_hash, hex_to_bytes32,
    to_eth_signed_message_hash,
};
use crate::msg::{
    ComputeExitIdResponse, ConfigResponse, ExitMessageHashResponse, ExitResponse, ExitStatus,
    ExitStatusResponse, ExitsResponse, StatsResponse,
};
use crate::state::{ExitRecord, CONFIG, EXITS, RESERVE, STATS};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 30;

fn parse_exit_id(exit_id: &str) -> StdResult<[u8; 32]> {
    hex_to_bytes32(exit_id).map_err(|e| StdError::generic_err(e.to_string()))
}

fn exit_response(exit_id: &[u8; 32], record: ExitRecord) -> ExitResponse {
    ExitResponse {
        exit_id: bytes32_to_hex(exit_id),
        user: record.user,
        amount: record.amount,
        data: record.data,
        block_number: record.block_number,
        processed: record.processed,
        signature: record.signature,
    }
}

pub fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        admin: config.admin,
        asset: config.asset,
        fee_bps: config.fee_bps,
        fee_collector: config.fee_collector,
        authorizer: address_to_hex(&config.authorizer),
        min_timelock: config.min_timelock,
    })
}

pub fn query_stats(deps: Deps) -> StdResult<StatsResponse> {
    let stats = STATS.load(deps.storage)?;
    Ok(StatsResponse {
        total_deposits: stats.total_deposits,
        total_deposited: stats.total_deposited,
        total_fees_collected: stats.total_fees_collected,
        total_exits_started: stats.total_exits_started,
        total_exits_processed: stats.total_exits_processed,
        total_released: stats.total_released,
        reserve: RESERVE.load(deps.storage)?,
    })
}

pub fn query_exit(deps: Deps, exit_id: String) -> StdResult<Option<ExitResponse>> {
    let id = parse_exit_id(&exit_id)?;
    Ok(EXITS
        .may_load(deps.storage, &id)?
        .map(|record| exit_response(&id, record)))
}

pub fn query_exit_by_data(deps: Deps, data: String) -> StdResult<Option<ExitResponse>> {
    let id = compute_exit_id(&data);
    Ok(EXITS
        .may_load(deps.storage, &id)?
        .map(|record| exit_response(&id, record)))
}

pub fn query_exits(
    deps: Deps,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<ExitsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let start_after = start_after.map(|id| parse_exit_id(&id)).transpose()?;
    let start = start_after.as_ref().map(|id| Bound::exclusive(id.as_slice()));

    let exits = EXITS
        .range(deps.storage, start, None, Order::Ascending)
        .take(limit)
        .map(|item| {
            let (key, record) = item?;
            let id: [u8; 32] = key
                .as_slice()
                .try_into()
                .map_err(|_| StdError::generic_err("corrupt exit key"))?;
            Ok(exit_response(&id, record))
        })
        .collect::<StdResult<_>>()?;

    Ok(ExitsResponse { exits })
}

pub fn query_compute_exit_id(data: String) -> StdResult<ComputeExitIdResponse> {
    Ok(ComputeExitIdResponse {
        exit_id: bytes32_to_hex(&compute_exit_id(&data)),
    })
}

pub fn query_exit_message_hash(
    exit_id: String,
    amount: Uint128,
    caller: String,
) -> StdResult<ExitMessageHashResponse> {
    let id = parse_exit_id(&exit_id)?;
    let message_hash = compute_exit_message_hash(&id, amount, &caller);
    Ok(ExitMessageHashResponse {
        message_hash: bytes32_to_hex(&message_hash),
        signed_hash: bytes32_to_hex(&to_eth_signed_message_hash(&message_hash)),
    })
}

pub fn query_exit_status(deps: Deps, env: Env, exit_id: String) -> StdResult<ExitStatusResponse> {
    let id = parse_exit_id(&exit_id)?;
    let Some(record) = EXITS.may_load(deps.storage, &id)? else {
        return Ok(ExitStatusResponse {
            status: ExitStatus::Unknown,
            remaining_blocks: 0,
        });
    };

    if record.processed {
        return Ok(ExitStatusResponse {
            status: ExitStatus::Processed,
            remaining_blocks: 0,
        });
    }

    let min_timelock = CONFIG.load(deps.storage)?.min_timelock;
    let mature_at = record.block_number.saturating_add(min_timelock);
    Ok(ExitStatusResponse {
        status: ExitStatus::Started,
        remaining_blocks: mature_at.saturating_sub(env.block.height),
    })
}
