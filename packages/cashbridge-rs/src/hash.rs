//! Hash computation for both sides of the bridge
//!
//! The UTXO side identifies transactions by double SHA-256. The account side
//! identifies exits by keccak-256 and authorizes them with EVM-style signed
//! message hashes; the functions here match the exit ledger contract
//! byte-for-byte so an operator can precompute what the contract will check.
//!
//! ## Exit message layout
//!
//! ```text
//! exit_id      = keccak256(data)
//! message_hash = keccak256(exit_id(32) || uint256(amount)(32, big-endian) || caller(utf-8))
//! signed_hash  = keccak256("\x19Ethereum Signed Message:\n32" || message_hash)
//! ```

use sha2::{Digest, Sha256};
use tiny_keccak::{Hasher, Keccak};

/// Prefix applied by EVM wallets before signing a 32-byte message
pub const ETH_SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Compute keccak256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// Single SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256 (transaction ids, OP_HASH256)
pub fn hash256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

// ============================================================================
// Exit Authorization Hashes
// ============================================================================

/// Exit identifier: keccak256 of the exit's data string
///
/// `data` is typically the UTXO-side transaction id that burned the tokens,
/// so it must be globally unique per legitimate exit.
pub fn compute_exit_id(data: &str) -> [u8; 32] {
    keccak256(data.as_bytes())
}

/// Message an authorizer signs to release an exit
pub fn compute_exit_message_hash(exit_id: &[u8; 32], amount: u128, caller: &str) -> [u8; 32] {
    // exit_id (32) + amount as uint256 (32) + caller bytes
    let mut data = Vec::with_capacity(64 + caller.len());
    data.extend_from_slice(exit_id);

    let mut amount_bytes = [0u8; 32];
    amount_bytes[16..].copy_from_slice(&amount.to_be_bytes());
    data.extend_from_slice(&amount_bytes);

    data.extend_from_slice(caller.as_bytes());
    keccak256(&data)
}

/// Wrap a 32-byte hash the way `personal_sign` / `eth_sign` do
pub fn to_eth_signed_message_hash(hash: &[u8; 32]) -> [u8; 32] {
    let mut data = Vec::with_capacity(ETH_SIGNED_MESSAGE_PREFIX.len() + 32);
    data.extend_from_slice(ETH_SIGNED_MESSAGE_PREFIX);
    data.extend_from_slice(hash);
    keccak256(&data)
}

/// Convert bytes to hex string with 0x prefix
pub fn bytes32_to_hex(bytes: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a 0x-prefixed (or bare) 32-byte hex string
pub fn parse_bytes32(hex_str: &str) -> Result<[u8; 32], String> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(stripped).map_err(|e| format!("invalid hex: {}", e))?;
    if bytes.len() != 32 {
        return Err(format!("expected 32 bytes, got {}", bytes.len()));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256() {
        let result = keccak256(b"hello");
        assert_eq!(
            bytes32_to_hex(&result),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_hash256_empty() {
        // Displayed reversed, like a txid
        let mut digest = hash256(b"");
        digest.reverse();
        assert_eq!(
            hex::encode(digest),
            "56944c5d3f98413ef45cf54545538103cc9f298e0575820ad3591376e2e0f65d"
        );
    }

    #[test]
    fn test_compute_exit_id() {
        assert_eq!(
            bytes32_to_hex(&compute_exit_id("tx123")),
            "0x889eb6fcbadef21db17ffae7cd0eeeb28329bf4fb1ba5bb17a0e207ebcb6db25"
        );
        assert_ne!(compute_exit_id("tx123"), compute_exit_id("tx124"));
    }

    #[test]
    fn test_compute_exit_message_hash() {
        let exit_id = compute_exit_id("tx123");
        let hash = compute_exit_message_hash(&exit_id, 1000, "terra1user");
        assert_eq!(
            bytes32_to_hex(&hash),
            "0x58c941187433e44733697c34869bdac0ca9037e9b7de07cf271458cdb3b089b9"
        );

        // Caller and amount are both bound into the message
        assert_ne!(hash, compute_exit_message_hash(&exit_id, 1001, "terra1user"));
        assert_ne!(hash, compute_exit_message_hash(&exit_id, 1000, "terra1other"));
    }

    #[test]
    fn test_to_eth_signed_message_hash() {
        let exit_id = compute_exit_id("tx123");
        let hash = compute_exit_message_hash(&exit_id, 1000, "terra1user");
        assert_eq!(
            bytes32_to_hex(&to_eth_signed_message_hash(&hash)),
            "0xc6ad62f35c4c75c72072e8416e4a74dad6e4a45224a924b6a3e57b4f5563596f"
        );
    }

    #[test]
    fn test_parse_bytes32() {
        let id = compute_exit_id("tx123");
        assert_eq!(parse_bytes32(&bytes32_to_hex(&id)).unwrap(), id);
        assert!(parse_bytes32("0x1234").is_err());
        assert!(parse_bytes32("zz").is_err());
    }
}
