//! Execute handlers for the exit ledger contract.
//!
//! - `deposit` - Native and CW20 deposits toward the UTXO side
//! - `exit` - StartExit and ProcessExit
//! - `admin` - Configuration updates and admin transfer

mod admin;
mod deposit;
mod exit;

pub use admin::*;
pub use deposit::*;
pub use exit::*;

use cosmwasm_std::{to_json_binary, Addr, BankMsg, Coin, CosmosMsg, StdResult, Uint128, WasmMsg};
use cw20::Cw20ExecuteMsg;

use crate::state::Asset;

/// Send `amount` of the ledger's asset from the contract to `recipient`
pub(crate) fn transfer_msg(asset: &Asset, recipient: &Addr, amount: Uint128) -> StdResult<CosmosMsg> {
    Ok(match asset {
        Asset::Native { denom } => CosmosMsg::Bank(BankMsg::Send {
            to_address: recipient.to_string(),
            amount: vec![Coin {
                denom: denom.clone(),
                amount,
            }],
        }),
        Asset::Cw20 { contract_addr } => CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: contract_addr.to_string(),
            msg: to_json_binary(&Cw20ExecuteMsg::Transfer {
                recipient: recipient.to_string(),
                amount,
            })?,
            funds: vec![],
        }),
    })
}
