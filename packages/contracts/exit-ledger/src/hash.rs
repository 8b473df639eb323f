//! Exit hashes and authorizer recovery
//!
//! Must match the off-chain authorizer byte-for-byte.
//!
//! # Byte Layout
//! - `exit_id = keccak256(data)`
//! - `message_hash = keccak256(exit_id(32) || amount(uint256, big-endian, 32) || caller(utf-8))`
//! - `signed_hash = keccak256("\x19Ethereum Signed Message:\n32" || message_hash)`
//!
//! The authorizer is identified by its 20-byte EVM address: the last 20
//! bytes of keccak256 over the uncompressed public key without its `0x04`
//! prefix.

use cosmwasm_std::{Api, Uint128};
use tiny_keccak::{Hasher, Keccak};

use crate::error::ContractError;

pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute keccak256 hash of arbitrary data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

pub fn compute_exit_id(data: &str) -> [u8; 32] {
    keccak256(data.as_bytes())
}

pub fn compute_exit_message_hash(exit_id: &[u8; 32], amount: Uint128, caller: &str) -> [u8; 32] {
    let mut data = Vec::with_capacity(64 + caller.len());
    data.extend_from_slice(exit_id);

    // uint256: 16 zero bytes then the u128
    let mut amount_bytes = [0u8; 32];
    amount_bytes[16..].copy_from_slice(&amount.u128().to_be_bytes());
    data.extend_from_slice(&amount_bytes);

    data.extend_from_slice(caller.as_bytes());
    keccak256(&data)
}

pub fn to_eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
    data.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    data.extend_from_slice(hash);
    keccak256(&data)
}

/// EVM address of the key that produced `signature` over `signed_hash`
///
/// `signature` is `r(32) || s(32) || v(1)` with `v` in {0, 1, 27, 28}.
pub fn recover_signer(
    api: &dyn Api,
    signed_hash: &[u8; 32],
    signature: &[u8],
) -> Result<[u8; 20], ContractError> {
    if signature.len() != 65 {
        return Err(ContractError::InvalidAuthorization);
    }
    let recovery_param = match signature[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        _ => return Err(ContractError::InvalidAuthorization),
    };

    let pubkey = api
        .secp256k1_recover_pubkey(signed_hash, &signature[..64], recovery_param)
        .map_err(|_| ContractError::InvalidAuthorization)?;
    pubkey_to_address(&pubkey)
}

/// Address of an uncompressed (65-byte, `0x04`-prefixed) public key
pub fn pubkey_to_address(pubkey: &[u8]) -> Result<[u8; 20], ContractError> {
    if pubkey.len() != 65 || pubkey[0] != 0x04 {
        return Err(ContractError::InvalidAuthorization);
    }
    let hash = keccak256(&pubkey[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(address)
}

/// Convert 32-byte hash to hex string (for attributes/logging)
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn address_to_hex(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}

/// Parse hex string (with or without 0x prefix) to 32-byte array
pub fn hex_to_bytes32(value: &str) -> Result<[u8; 32], ContractError> {
    let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(value)).map_err(|_| {
        ContractError::InvalidHashLength {
            got: value.len() / 2,
        }
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ContractError::InvalidHashLength { got: bytes.len() })
}

/// Parse a 20-byte EVM address (with or without 0x prefix)
pub fn hex_to_address(value: &str) -> Result<[u8; 20], ContractError> {
    let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(value)).map_err(|e| {
        ContractError::InvalidAddress {
            reason: format!("authorizer is not hex: {}", e),
        }
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ContractError::InvalidAddress {
            reason: format!("authorizer must be 20 bytes, got {}", bytes.len()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_id_vector() {
        assert_eq!(
            bytes32_to_hex(&compute_exit_id("tx123")),
            "0x889eb6fcbadef21db17ffae7cd0eeeb28329bf4fb1ba5bb17a0e207ebcb6db25"
        );
    }

    #[test]
    fn test_message_hash_vectors() {
        let exit_id = compute_exit_id("tx123");
        let hash = compute_exit_message_hash(&exit_id, Uint128::new(1000), "terra1user");
        assert_eq!(
            bytes32_to_hex(&hash),
            "0x58c941187433e44733697c34869bdac0ca9037e9b7de07cf271458cdb3b089b9"
        );
        assert_eq!(
            bytes32_to_hex(&to_eth_signed_message_hash(&hash)),
            "0xc6ad62f35c4c75c72072e8416e4a74dad6e4a45224a924b6a3e57b4f5563596f"
        );
    }

    #[test]
    fn test_hex_parsing() {
        let id = compute_exit_id("tx123");
        assert_eq!(hex_to_bytes32(&bytes32_to_hex(&id)).unwrap(), id);
        assert_eq!(
            hex_to_bytes32("0x1234"),
            Err(ContractError::InvalidHashLength { got: 2 })
        );
        assert!(hex_to_address("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_ok());
        assert!(matches!(
            hex_to_address("0xf39f"),
            Err(ContractError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_pubkey_to_address_rejects_compressed() {
        assert_eq!(
            pubkey_to_address(&[0x02; 33]),
            Err(ContractError::InvalidAuthorization)
        );
    }
}
