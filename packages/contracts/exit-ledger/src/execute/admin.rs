//! Admin operations handlers.

use cosmwasm_std::{DepsMut, MessageInfo, Response};

use crate::error::ContractError;
use crate::fee_manager::validate_fee_bps;
use crate::hash::{address_to_hex, hex_to_address};
use crate::state::CONFIG;

/// Update fee, fee collector, authorizer or timelock.
pub fn execute_update_config(
    deps: DepsMut,
    info: MessageInfo,
    fee_bps: Option<u64>,
    fee_collector: Option<String>,
    authorizer: Option<String>,
    min_timelock: Option<u64>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }

    let mut response = Response::new().add_attribute("method", "update_config");

    if let Some(fee_bps) = fee_bps {
        validate_fee_bps(fee_bps)?;
        config.fee_bps = fee_bps;
        response = response.add_attribute("fee_bps", fee_bps.to_string());
    }
    if let Some(fee_collector) = fee_collector {
        config.fee_collector = deps.api.addr_validate(&fee_collector)?;
        response = response.add_attribute("fee_collector", fee_collector);
    }
    if let Some(authorizer) = authorizer {
        config.authorizer = hex_to_address(&authorizer)?;
        response = response.add_attribute("authorizer", address_to_hex(&config.authorizer));
    }
    if let Some(min_timelock) = min_timelock {
        config.min_timelock = min_timelock;
        response = response.add_attribute("min_timelock", min_timelock.to_string());
    }

    CONFIG.save(deps.storage, &config)?;
    Ok(response)
}

/// Hand the admin role to `new_admin`.
pub fn execute_transfer_admin(
    deps: DepsMut,
    info: MessageInfo,
    new_admin: String,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized);
    }

    config.admin = deps.api.addr_validate(&new_admin)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "transfer_admin")
        .add_attribute("new_admin", config.admin.to_string()))
}
