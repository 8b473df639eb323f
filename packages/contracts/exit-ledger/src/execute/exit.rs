//! Exit handlers (StartExit and ProcessExit).
//!
//! Per exit id: `Unknown -> Started -> Processed`. A record is created once
//! and flipped to processed once; nothing else ever changes it.

use cosmwasm_std::{Binary, DepsMut, Env, Event, MessageInfo, Response, Uint128};

use crate::error::ContractError;
use crate::execute::transfer_msg;
use crate::hash::{
    bytes32_to_hex, compute_exit_id, compute_exit_message_hash, hex_to_bytes32, recover_signer,
    to_eth_signed_message_hash,
};
use crate::state::{ExitRecord, CONFIG, EXITS, RESERVE, STATS};

/// Record an exit request keyed by `keccak256(data)`
pub fn execute_start_exit(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    amount: Uint128,
    data: String,
) -> Result<Response, ContractError> {
    if amount.is_zero() {
        return Err(ContractError::InvalidAmount {
            reason: "Exit amount must be greater than zero".to_string(),
        });
    }

    let exit_id = compute_exit_id(&data);
    if EXITS.has(deps.storage, &exit_id) {
        return Err(ContractError::DuplicateExit {
            exit_id: bytes32_to_hex(&exit_id),
        });
    }

    let record = ExitRecord {
        user: info.sender.clone(),
        amount,
        data: data.clone(),
        block_number: env.block.height,
        processed: false,
        signature: None,
    };
    EXITS.save(deps.storage, &exit_id, &record)?;
    STATS.update(deps.storage, |mut stats| -> Result<_, ContractError> {
        stats.total_exits_started += 1;
        Ok(stats)
    })?;

    Ok(Response::new()
        .add_attribute("method", "start_exit")
        .add_event(
            Event::new("start_exit")
                .add_attribute("exit_id", bytes32_to_hex(&exit_id))
                .add_attribute("user", info.sender.to_string())
                .add_attribute("amount", amount.to_string())
                .add_attribute("data", data)
                .add_attribute("block_number", env.block.height.to_string()),
        ))
}

/// Release a matured exit to its user
///
/// The authorizer signs for a specific caller: the message hash binds
/// `exit_id`, the recorded amount, and the address submitting this message.
pub fn execute_process_exit(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    exit_id: String,
    signature: Binary,
) -> Result<Response, ContractError> {
    let id = hex_to_bytes32(&exit_id)?;
    let exit_id = bytes32_to_hex(&id);
    let mut record = EXITS
        .may_load(deps.storage, &id)?
        .ok_or_else(|| ContractError::ExitNotFound {
            exit_id: exit_id.clone(),
        })?;

    if record.processed {
        return Err(ContractError::AlreadyProcessed { exit_id });
    }

    let config = CONFIG.load(deps.storage)?;
    let mature_at = record.block_number.saturating_add(config.min_timelock);
    if env.block.height < mature_at {
        return Err(ContractError::Immature {
            remaining_blocks: mature_at - env.block.height,
        });
    }

    let message_hash = compute_exit_message_hash(&id, record.amount, info.sender.as_str());
    let signer = recover_signer(
        deps.api,
        &to_eth_signed_message_hash(&message_hash),
        signature.as_slice(),
    )?;
    if signer != config.authorizer {
        return Err(ContractError::InvalidAuthorization);
    }

    let reserve = RESERVE.load(deps.storage)?;
    if reserve < record.amount {
        return Err(ContractError::InsufficientLiquidity {
            available: reserve.to_string(),
            required: record.amount.to_string(),
        });
    }

    record.processed = true;
    record.signature = Some(signature);
    EXITS.save(deps.storage, &id, &record)?;
    RESERVE.save(deps.storage, &(reserve - record.amount))?;
    STATS.update(deps.storage, |mut stats| -> Result<_, ContractError> {
        stats.total_exits_processed += 1;
        stats.total_released += record.amount;
        Ok(stats)
    })?;

    Ok(Response::new()
        .add_message(transfer_msg(&config.asset, &record.user, record.amount)?)
        .add_attribute("method", "process_exit")
        .add_event(
            Event::new("process_exit")
                .add_attribute("exit_id", exit_id)
                .add_attribute("user", record.user.to_string())
                .add_attribute("amount", record.amount.to_string())
                .add_attribute("caller", info.sender.to_string()),
        ))
}
