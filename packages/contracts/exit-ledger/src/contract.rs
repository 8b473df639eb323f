//! Exit Ledger - Entry Points
//!
//! The implementation is modularized into:
//! - `execute/` - Execute message handlers
//! - `query` - Query message handlers

use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response, StdResult,
    Uint128,
};
use cw2::set_contract_version;

use crate::error::ContractError;
use crate::execute::{
    execute_deposit_native, execute_process_exit, execute_receive, execute_start_exit,
    execute_transfer_admin, execute_update_config,
};
use crate::fee_manager::validate_fee_bps;
use crate::hash::{address_to_hex, hex_to_address};
use crate::msg::{AssetInfo, ExecuteMsg, InstantiateMsg, MigrateMsg, QueryMsg};
use crate::query::{
    query_compute_exit_id, query_config, query_exit, query_exit_by_data, query_exit_message_hash,
    query_exit_status, query_exits, query_stats,
};
use crate::state::{
    Asset, Config, Stats, CONFIG, CONTRACT_NAME, CONTRACT_VERSION, RESERVE, STATS,
};

// ============================================================================
// Instantiate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let admin = deps.api.addr_validate(&msg.admin)?;
    let fee_collector = deps.api.addr_validate(&msg.fee_collector)?;
    validate_fee_bps(msg.fee_bps)?;
    let authorizer = hex_to_address(&msg.authorizer)?;

    let asset = match msg.asset {
        AssetInfo::Native { denom } => {
            if denom.is_empty() {
                return Err(ContractError::InvalidAddress {
                    reason: "Native denom must not be empty".to_string(),
                });
            }
            Asset::Native { denom }
        }
        AssetInfo::Cw20 { contract_addr } => Asset::Cw20 {
            contract_addr: deps.api.addr_validate(&contract_addr)?,
        },
    };

    let config = Config {
        admin,
        asset,
        fee_bps: msg.fee_bps,
        fee_collector,
        authorizer,
        min_timelock: msg.min_timelock,
    };
    CONFIG.save(deps.storage, &config)?;
    STATS.save(deps.storage, &Stats::default())?;
    RESERVE.save(deps.storage, &Uint128::zero())?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("admin", config.admin)
        .add_attribute("asset", config.asset.label())
        .add_attribute("fee_bps", config.fee_bps.to_string())
        .add_attribute("authorizer", address_to_hex(&config.authorizer))
        .add_attribute("min_timelock", config.min_timelock.to_string()))
}

// ============================================================================
// Execute
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        // Deposits
        ExecuteMsg::Deposit { data } => execute_deposit_native(deps, info, data),
        ExecuteMsg::Receive(cw20_msg) => execute_receive(deps, info, cw20_msg),

        // Exits
        ExecuteMsg::StartExit { amount, data } => {
            execute_start_exit(deps, env, info, amount, data)
        }
        ExecuteMsg::ProcessExit { exit_id, signature } => {
            execute_process_exit(deps, env, info, exit_id, signature)
        }

        // Admin operations
        ExecuteMsg::UpdateConfig {
            fee_bps,
            fee_collector,
            authorizer,
            min_timelock,
        } => execute_update_config(deps, info, fee_bps, fee_collector, authorizer, min_timelock),
        ExecuteMsg::TransferAdmin { new_admin } => execute_transfer_admin(deps, info, new_admin),
    }
}

// ============================================================================
// Query
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::Stats {} => to_json_binary(&query_stats(deps)?),
        QueryMsg::Exit { exit_id } => to_json_binary(&query_exit(deps, exit_id)?),
        QueryMsg::ExitByData { data } => to_json_binary(&query_exit_by_data(deps, data)?),
        QueryMsg::Exits { start_after, limit } => {
            to_json_binary(&query_exits(deps, start_after, limit)?)
        }
        QueryMsg::ComputeExitId { data } => to_json_binary(&query_compute_exit_id(data)?),
        QueryMsg::ExitMessageHash {
            exit_id,
            amount,
            caller,
        } => to_json_binary(&query_exit_message_hash(exit_id, amount, caller)?),
        QueryMsg::ExitStatus { exit_id } => {
            to_json_binary(&query_exit_status(deps, env, exit_id)?)
        }
    }
}

// ============================================================================
// Migrate
// ============================================================================

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: MigrateMsg) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::new()
        .add_attribute("action", "migrate")
        .add_attribute("version", CONTRACT_VERSION))
}
