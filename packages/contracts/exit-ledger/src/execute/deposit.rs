//! Deposit handlers (native funds and CW20 Receive).
//!
//! A deposit creates no ledger entry: it only grows the reserve and emits a
//! `bridge` event the UTXO side watches for.

use cosmwasm_std::{Addr, DepsMut, Event, MessageInfo, Response, Uint128};
use cw20::Cw20ReceiveMsg;

use crate::error::ContractError;
use crate::execute::transfer_msg;
use crate::fee_manager::split_deposit;
use crate::msg::ReceiveMsg;
use crate::state::{Asset, CONFIG, RESERVE, STATS};

/// Execute handler for native deposits
pub fn execute_deposit_native(
    deps: DepsMut,
    info: MessageInfo,
    data: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let denom = match &config.asset {
        Asset::Native { denom } => denom.clone(),
        Asset::Cw20 { .. } => {
            return Err(ContractError::WrongAsset {
                expected: config.asset.label(),
                got: "native funds".to_string(),
            })
        }
    };

    if info.funds.is_empty() {
        return Err(ContractError::NoFundsSent);
    }
    if info.funds.len() > 1 {
        return Err(ContractError::InvalidAmount {
            reason: "Only one token type allowed per deposit".to_string(),
        });
    }
    let coin = &info.funds[0];
    if coin.denom != denom {
        return Err(ContractError::WrongAsset {
            expected: denom,
            got: coin.denom.clone(),
        });
    }

    record_deposit(deps, &info.sender, coin.amount, data)
}

/// Execute handler for CW20 deposits (via `Cw20ExecuteMsg::Send`)
pub fn execute_receive(
    deps: DepsMut,
    info: MessageInfo,
    cw20_msg: Cw20ReceiveMsg,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;

    // info.sender is the token contract
    match &config.asset {
        Asset::Cw20 { contract_addr } if *contract_addr == info.sender => {}
        _ => {
            return Err(ContractError::WrongAsset {
                expected: config.asset.label(),
                got: info.sender.to_string(),
            })
        }
    }

    let sender = deps.api.addr_validate(&cw20_msg.sender)?;
    let receive_msg: ReceiveMsg = cosmwasm_std::from_json(&cw20_msg.msg)?;
    match receive_msg {
        ReceiveMsg::Deposit { data } => record_deposit(deps, &sender, cw20_msg.amount, data),
    }
}

/// Split off the fee, forward it, and credit the rest to the reserve
fn record_deposit(
    deps: DepsMut,
    sender: &Addr,
    amount: Uint128,
    data: String,
) -> Result<Response, ContractError> {
    if amount.is_zero() {
        return Err(ContractError::InvalidAmount {
            reason: "Deposit amount must be greater than zero".to_string(),
        });
    }

    let config = CONFIG.load(deps.storage)?;
    let (fee, amount_after_fee) = split_deposit(amount, config.fee_bps);

    RESERVE.update(deps.storage, |reserve| -> Result<_, ContractError> {
        Ok(reserve + amount_after_fee)
    })?;
    STATS.update(deps.storage, |mut stats| -> Result<_, ContractError> {
        stats.total_deposits += 1;
        stats.total_deposited += amount_after_fee;
        stats.total_fees_collected += fee;
        Ok(stats)
    })?;

    let mut response = Response::new();
    if !fee.is_zero() {
        response = response.add_message(transfer_msg(&config.asset, &config.fee_collector, fee)?);
    }

    Ok(response
        .add_attribute("method", "deposit")
        .add_event(
            Event::new("bridge")
                .add_attribute("sender", sender.to_string())
                .add_attribute("data", data)
                .add_attribute("amount", amount.to_string())
                .add_attribute("fee", fee.to_string())
                .add_attribute("amount_after_fee", amount_after_fee.to_string()),
        ))
}
