//! Claim NFT commitment codec
//!
//! A claim NFT carries a 16-byte commitment: the claimed amount followed by
//! the minimum input age, each as an 8-byte little-endian integer (the
//! network's script-number byte order). The Issuer covenant writes it and the
//! Bridge covenant reads it back with `OP_SPLIT` + `OP_BIN2NUM`, so the layout
//! must match exactly.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Serialized commitment length
pub const COMMITMENT_LEN: usize = 16;

/// Decoded claim NFT commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub amount: u64,
    pub min_age: u64,
}

impl Commitment {
    pub fn new(amount: u64, min_age: u64) -> Self {
        Self { amount, min_age }
    }

    pub fn to_bytes(&self) -> [u8; COMMITMENT_LEN] {
        let mut out = [0u8; COMMITMENT_LEN];
        out[..8].copy_from_slice(&self.amount.to_le_bytes());
        out[8..].copy_from_slice(&self.min_age.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (amount, min_age) = decode(bytes)?;
        Ok(Self { amount, min_age })
    }
}

/// Encode `amount || min_age`
///
/// Accepts wider integers so callers holding account-chain amounts (u128)
/// get an `Encoding` error instead of a silent truncation.
pub fn encode(amount: u128, min_age: u128) -> Result<[u8; COMMITMENT_LEN]> {
    let amount = u64::try_from(amount)
        .map_err(|_| BridgeError::Encoding(format!("amount {} exceeds 64 bits", amount)))?;
    let min_age = u64::try_from(min_age)
        .map_err(|_| BridgeError::Encoding(format!("min age {} exceeds 64 bits", min_age)))?;
    Ok(Commitment::new(amount, min_age).to_bytes())
}

/// Decode a commitment into `(amount, min_age)`
pub fn decode(bytes: &[u8]) -> Result<(u64, u64)> {
    if bytes.len() != COMMITMENT_LEN {
        return Err(BridgeError::Decoding(format!(
            "commitment must be {} bytes, got {}",
            COMMITMENT_LEN,
            bytes.len()
        )));
    }
    let mut amount = [0u8; 8];
    let mut min_age = [0u8; 8];
    amount.copy_from_slice(&bytes[..8]);
    min_age.copy_from_slice(&bytes[8..]);
    Ok((u64::from_le_bytes(amount), u64::from_le_bytes(min_age)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_known_vector() {
        let bytes = encode(1_500, 100).unwrap();
        assert_eq!(hex::encode(bytes), "dc050000000000006400000000000000");
    }

    #[test]
    fn test_encode_rejects_wide_values() {
        let too_big = u64::MAX as u128 + 1;
        assert!(matches!(encode(too_big, 0), Err(BridgeError::Encoding(_))));
        assert!(matches!(encode(0, too_big), Err(BridgeError::Encoding(_))));
        assert!(encode(u64::MAX as u128, u64::MAX as u128).is_ok());
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(matches!(decode(&[0u8; 15]), Err(BridgeError::Decoding(_))));
        assert!(matches!(decode(&[0u8; 17]), Err(BridgeError::Decoding(_))));
        assert!(matches!(decode(&[]), Err(BridgeError::Decoding(_))));
    }

    #[test]
    fn test_commitment_struct_matches_free_functions() {
        let c = Commitment::new(10_000, 144);
        assert_eq!(c.to_bytes(), encode(10_000, 144).unwrap());
        assert_eq!(Commitment::from_bytes(&c.to_bytes()).unwrap(), c);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(amount in any::<u64>(), min_age in any::<u64>()) {
            let bytes = encode(amount as u128, min_age as u128).unwrap();
            prop_assert_eq!(decode(&bytes).unwrap(), (amount, min_age));
        }
    }
}
