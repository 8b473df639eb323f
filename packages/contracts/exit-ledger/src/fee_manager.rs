//! Deposit fee calculation
//!
//! A flat basis-point fee on every deposit, forwarded to the fee collector.
//! `fee = amount * fee_bps / 10000`, rounded down.

use cosmwasm_std::Uint128;

use crate::error::ContractError;

/// Maximum fee in basis points (10% = 1000 bps)
pub const MAX_FEE_BPS: u64 = 1000;

/// Basis points denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10000;

pub fn validate_fee_bps(fee_bps: u64) -> Result<(), ContractError> {
    if fee_bps > MAX_FEE_BPS {
        return Err(ContractError::InvalidFee {
            fee_bps,
            max_bps: MAX_FEE_BPS,
        });
    }
    Ok(())
}

/// Fee owed on a deposit of `amount`
pub fn calculate_fee(amount: Uint128, fee_bps: u64) -> Uint128 {
    amount.multiply_ratio(fee_bps as u128, BPS_DENOMINATOR)
}

/// `(fee, amount_after_fee)` for a deposit
pub fn split_deposit(amount: Uint128, fee_bps: u64) -> (Uint128, Uint128) {
    let fee = calculate_fee(amount, fee_bps);
    (fee, amount - fee)
}
