//! CashAddr address encoding
//!
//! ## Format
//!
//! ```text
//! prefix ":" base32(version_byte || hash || checksum(40 bits))
//! ```
//!
//! The version byte packs the address type in bits 3..7 and the hash size in
//! bits 0..3:
//!
//! - type `0`: P2PKH, type `1`: P2SH
//! - type `2`: token-aware P2PKH, type `3`: token-aware P2SH
//! - size `0`: 20 bytes, size `3`: 32 bytes
//!
//! Token-aware addresses lock to the same bytecode as their plain
//! counterparts; the type only tells wallets the owner can receive tokens.

use std::fmt;

use crate::error::{BridgeError, Result};
use crate::script;

/// Default network prefix
pub const MAINNET_PREFIX: &str = "bitcoincash";

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;

// ============================================================================
// Address Kind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    P2pkh,
    P2sh,
}

impl AddressKind {
    fn type_bits(self, token_aware: bool) -> u8 {
        match (self, token_aware) {
            (AddressKind::P2pkh, false) => 0,
            (AddressKind::P2sh, false) => 1,
            (AddressKind::P2pkh, true) => 2,
            (AddressKind::P2sh, true) => 3,
        }
    }

    fn from_type_bits(bits: u8) -> Option<(Self, bool)> {
        match bits {
            0 => Some((AddressKind::P2pkh, false)),
            1 => Some((AddressKind::P2sh, false)),
            2 => Some((AddressKind::P2pkh, true)),
            3 => Some((AddressKind::P2sh, true)),
            _ => None,
        }
    }
}

fn size_bits(len: usize) -> Option<u8> {
    match len {
        20 => Some(0),
        24 => Some(1),
        28 => Some(2),
        32 => Some(3),
        40 => Some(4),
        48 => Some(5),
        56 => Some(6),
        64 => Some(7),
        _ => None,
    }
}

fn size_from_bits(bits: u8) -> usize {
    match bits {
        0 => 20,
        1 => 24,
        2 => 28,
        3 => 32,
        4 => 40,
        5 => 48,
        6 => 56,
        _ => 64,
    }
}

// ============================================================================
// CashAddress
// ============================================================================

/// A decoded CashAddr
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CashAddress {
    pub prefix: String,
    pub kind: AddressKind,
    pub token_aware: bool,
    pub hash: Vec<u8>,
}

impl CashAddress {
    pub fn new(prefix: &str, kind: AddressKind, token_aware: bool, hash: Vec<u8>) -> Result<Self> {
        if size_bits(hash.len()).is_none() {
            return Err(BridgeError::InvalidAddress(format!(
                "unsupported hash length {}",
                hash.len()
            )));
        }
        validate_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_ascii_lowercase(),
            kind,
            token_aware,
            hash,
        })
    }

    /// Decode a prefixed CashAddr string
    pub fn decode(address: &str) -> Result<Self> {
        let (prefix, payload) = address.rsplit_once(':').ok_or_else(|| {
            BridgeError::InvalidAddress(format!("'{}' is missing its prefix", address))
        })?;
        decode_parts(prefix, payload)
    }

    /// Decode, assuming `default_prefix` when the string carries none
    pub fn decode_with_prefix(address: &str, default_prefix: &str) -> Result<Self> {
        match address.rsplit_once(':') {
            Some((prefix, payload)) => decode_parts(prefix, payload),
            None => decode_parts(default_prefix, address),
        }
    }

    /// Encode to the prefixed string form
    pub fn encode(&self) -> Result<String> {
        let size = size_bits(self.hash.len()).ok_or_else(|| {
            BridgeError::InvalidAddress(format!("unsupported hash length {}", self.hash.len()))
        })?;
        let version = (self.kind.type_bits(self.token_aware) << 3) | size;

        let mut payload8 = Vec::with_capacity(1 + self.hash.len());
        payload8.push(version);
        payload8.extend_from_slice(&self.hash);
        let mut payload5 = convert_bits(&payload8, 8, 5, true)?;

        let checksum = create_checksum(&self.prefix, &payload5);
        payload5.extend_from_slice(&checksum);

        let mut out = String::with_capacity(self.prefix.len() + 1 + payload5.len());
        out.push_str(&self.prefix);
        out.push(':');
        for v in payload5 {
            out.push(CHARSET[v as usize] as char);
        }
        Ok(out)
    }

    /// Same owner, token-aware address type
    pub fn to_token_aware(&self) -> Self {
        Self {
            token_aware: true,
            ..self.clone()
        }
    }

    /// Locking bytecode paying to this address
    pub fn locking_bytecode(&self) -> Result<Vec<u8>> {
        match (self.kind, self.hash.len()) {
            (AddressKind::P2pkh, 20) => Ok(script::p2pkh(&to_array(&self.hash))),
            (AddressKind::P2sh, 20) => Ok(script::p2sh20(&to_array(&self.hash))),
            (AddressKind::P2sh, 32) => Ok(script::p2sh32(&to_array(&self.hash))),
            (kind, len) => Err(BridgeError::InvalidAddress(format!(
                "no standard locking bytecode for {:?} with {}-byte hash",
                kind, len
            ))),
        }
    }

    /// Recover an address from standard locking bytecode
    pub fn from_locking_bytecode(bytecode: &[u8], prefix: &str, token_aware: bool) -> Result<Self> {
        let (kind, hash) = match bytecode {
            [0x76, 0xa9, 20, hash @ .., 0x88, 0xac] if hash.len() == 20 => (AddressKind::P2pkh, hash),
            [0xa9, 20, hash @ .., 0x87] if hash.len() == 20 => (AddressKind::P2sh, hash),
            [0xaa, 32, hash @ .., 0x87] if hash.len() == 32 => (AddressKind::P2sh, hash),
            _ => {
                return Err(BridgeError::InvalidAddress(format!(
                    "non-standard locking bytecode {}",
                    hex::encode(bytecode)
                )))
            }
        };
        Self::new(prefix, kind, token_aware, hash.to_vec())
    }
}

impl fmt::Display for CashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.encode() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{}:<invalid>", self.prefix),
        }
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(BridgeError::InvalidAddress(format!("invalid prefix '{}'", prefix)));
    }
    Ok(())
}

fn decode_parts(prefix: &str, payload: &str) -> Result<CashAddress> {
    validate_prefix(prefix)?;

    let has_lower = payload.bytes().chain(prefix.bytes()).any(|b| b.is_ascii_lowercase());
    let has_upper = payload.bytes().chain(prefix.bytes()).any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(BridgeError::InvalidAddress("mixed-case address".to_string()));
    }
    let prefix = prefix.to_ascii_lowercase();

    let mut values = Vec::with_capacity(payload.len());
    for c in payload.to_ascii_lowercase().bytes() {
        let v = CHARSET.iter().position(|&x| x == c).ok_or_else(|| {
            BridgeError::InvalidAddress(format!("invalid character '{}'", c as char))
        })?;
        values.push(v as u8);
    }
    if values.len() <= CHECKSUM_LEN {
        return Err(BridgeError::InvalidAddress("address too short".to_string()));
    }
    if polymod(&expand_prefix(&prefix), &values) != 0 {
        return Err(BridgeError::InvalidAddress("checksum mismatch".to_string()));
    }

    let payload8 = convert_bits(&values[..values.len() - CHECKSUM_LEN], 5, 8, false)?;
    let (&version, hash) = payload8
        .split_first()
        .ok_or_else(|| BridgeError::InvalidAddress("empty payload".to_string()))?;

    if version & 0x80 != 0 {
        return Err(BridgeError::InvalidAddress("reserved version bit set".to_string()));
    }
    let (kind, token_aware) = AddressKind::from_type_bits(version >> 3).ok_or_else(|| {
        BridgeError::InvalidAddress(format!("unknown address type {}", version >> 3))
    })?;
    let expected = size_from_bits(version & 0x07);
    if hash.len() != expected {
        return Err(BridgeError::InvalidAddress(format!(
            "hash is {} bytes, version byte says {}",
            hash.len(),
            expected
        )));
    }

    Ok(CashAddress {
        prefix,
        kind,
        token_aware,
        hash: hash.to_vec(),
    })
}

// ============================================================================
// Checksum
// ============================================================================

fn expand_prefix(prefix: &str) -> Vec<u8> {
    let mut out: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    out.push(0);
    out
}

/// BCH code over GF(2^5); a valid address yields 0
fn polymod(prefix: &[u8], values: &[u8]) -> u64 {
    let mut c: u64 = 1;
    for &d in prefix.iter().chain(values) {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ d as u64;
        if c0 & 0x01 != 0 {
            c ^= 0x98_f2bc_8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79_b76d_99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf3_3e5f_b3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae_2eab_e2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e_4f43_e470;
        }
    }
    c ^ 1
}

fn create_checksum(prefix: &str, payload5: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut values = payload5.to_vec();
    values.extend_from_slice(&[0u8; CHECKSUM_LEN]);
    let modulus = polymod(&expand_prefix(prefix), &values);
    let mut out = [0u8; CHECKSUM_LEN];
    for (i, v) in out.iter_mut().enumerate() {
        *v = ((modulus >> (5 * (7 - i))) & 0x1f) as u8;
    }
    out
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max = (1u32 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        acc = (acc << from) | value as u32;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max) != 0 {
        return Err(BridgeError::InvalidAddress("invalid padding".to_string()));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH20: &str = "76a04053bda0a88bda5177b86a15c3b29f559873";

    #[test]
    fn test_decode_p2pkh() {
        let addr = CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").unwrap();
        assert_eq!(addr.kind, AddressKind::P2pkh);
        assert!(!addr.token_aware);
        assert_eq!(hex::encode(&addr.hash), HASH20);
        assert_eq!(
            hex::encode(addr.locking_bytecode().unwrap()),
            format!("76a914{}88ac", HASH20)
        );
    }

    #[test]
    fn test_encode_all_types() {
        let hash = hex::decode(HASH20).unwrap();
        let cases = [
            (AddressKind::P2pkh, false, "bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a"),
            (AddressKind::P2pkh, true, "bitcoincash:zpm2qsznhks23z7629mms6s4cwef74vcwvrqekrq9w"),
            (AddressKind::P2sh, false, "bitcoincash:ppm2qsznhks23z7629mms6s4cwef74vcwvn0h829pq"),
            (AddressKind::P2sh, true, "bitcoincash:rpm2qsznhks23z7629mms6s4cwef74vcwv59yeyr7n"),
        ];
        for (kind, token_aware, expected) in cases {
            let addr = CashAddress::new(MAINNET_PREFIX, kind, token_aware, hash.clone()).unwrap();
            assert_eq!(addr.encode().unwrap(), expected);
            assert_eq!(CashAddress::decode(expected).unwrap(), addr);
        }
    }

    #[test]
    fn test_testnet_prefix() {
        let hash = hex::decode(HASH20).unwrap();
        let addr = CashAddress::new("bchtest", AddressKind::P2pkh, true, hash).unwrap();
        assert_eq!(
            addr.encode().unwrap(),
            "bchtest:zpm2qsznhks23z7629mms6s4cwef74vcwv8ja3phzj"
        );
    }

    #[test]
    fn test_p2sh32() {
        let hash: Vec<u8> = (0u8..32).collect();
        let addr = CashAddress::new(MAINNET_PREFIX, AddressKind::P2sh, false, hash.clone()).unwrap();
        assert_eq!(
            addr.encode().unwrap(),
            "bitcoincash:pvqqzqsrqszsvpcgpy9qkrqdpc83qygjzv2p29shrqv35xcur50p7h2c7ctj5"
        );
        assert_eq!(
            addr.to_token_aware().encode().unwrap(),
            "bitcoincash:rvqqzqsrqszsvpcgpy9qkrqdpc83qygjzv2p29shrqv35xcur50p79eylp2tl"
        );
        assert_eq!(
            hex::encode(addr.locking_bytecode().unwrap()),
            format!("aa20{}87", hex::encode(&hash))
        );
    }

    #[test]
    fn test_token_aware_keeps_locking_bytecode() {
        let addr = CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").unwrap();
        let token = addr.to_token_aware();
        assert!(token.token_aware);
        assert_eq!(token.locking_bytecode().unwrap(), addr.locking_bytecode().unwrap());
    }

    #[test]
    fn test_decode_without_prefix_uses_default() {
        let addr = CashAddress::decode_with_prefix(
            "qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a",
            MAINNET_PREFIX,
        )
        .unwrap();
        assert_eq!(hex::encode(&addr.hash), HASH20);
        // Wrong prefix changes the checksum
        assert!(CashAddress::decode_with_prefix("qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a", "bchtest").is_err());
    }

    #[test]
    fn test_decode_rejects_corruption() {
        assert!(CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6b").is_err());
        assert!(CashAddress::decode("bitcoincash:Qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").is_err());
        assert!(CashAddress::decode("qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").is_err());
        assert!(CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdxob").is_err());
    }

    #[test]
    fn test_uppercase_accepted() {
        let upper = "BITCOINCASH:QPM2QSZNHKS23Z7629MMS6S4CWEF74VCWVY22GDX6A";
        let addr = CashAddress::decode(upper).unwrap();
        assert_eq!(addr.prefix, "bitcoincash");
        assert_eq!(hex::encode(&addr.hash), HASH20);
    }

    #[test]
    fn test_from_locking_bytecode() {
        let addr = CashAddress::decode("bitcoincash:qpm2qsznhks23z7629mms6s4cwef74vcwvy22gdx6a").unwrap();
        let bytecode = addr.locking_bytecode().unwrap();
        let back = CashAddress::from_locking_bytecode(&bytecode, MAINNET_PREFIX, false).unwrap();
        assert_eq!(back, addr);
        assert!(CashAddress::from_locking_bytecode(&[0x6a], MAINNET_PREFIX, false).is_err());
    }

    #[test]
    fn test_p2pkh_32_has_no_locking_bytecode() {
        let addr = CashAddress::new(MAINNET_PREFIX, AddressKind::P2pkh, false, vec![0u8; 32]).unwrap();
        assert!(addr.locking_bytecode().is_err());
    }
}
