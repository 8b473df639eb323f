//! Common types for bridge operations
//!
//! UTXO-side values (outpoints, token data, UTXOs) keep byte strings in the
//! order the network serializes them. Hex helpers convert to and from the
//! human-readable display order, which for transaction ids and token
//! categories is the byte-reversed form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{BridgeError, Result};

/// Decode a hex string (with or without 0x prefix) into a fixed-size array
fn decode_fixed<const N: usize>(hex_str: &str, what: &str) -> Result<[u8; N]> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str)
        .map_err(|e| BridgeError::Decoding(format!("{} is not valid hex: {}", what, e)))?;
    if bytes.len() != N {
        return Err(BridgeError::Decoding(format!(
            "{} must be {} bytes, got {}",
            what,
            N,
            bytes.len()
        )));
    }
    let mut result = [0u8; N];
    result.copy_from_slice(&bytes);
    Ok(result)
}

/// Reverse a 32-byte array (display order <-> wire order)
fn reversed(bytes: [u8; 32]) -> [u8; 32] {
    let mut out = bytes;
    out.reverse();
    out
}

// ============================================================================
// Transaction Id & Token Category (32 bytes, reversed display)
// ============================================================================

/// Transaction id, stored in wire (internal) byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Parse from the display (RPC) hex form
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(TxId(reversed(decode_fixed::<32>(hex_str, "txid")?)))
    }

    /// Display (RPC) hex form
    pub fn to_hex(&self) -> String {
        hex::encode(reversed(self.0))
    }

    /// Raw bytes in wire order
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build from wire-order bytes
    pub fn from_wire_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(BridgeError::Decoding(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut result = [0u8; 32];
        result.copy_from_slice(bytes);
        Ok(TxId(result))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Token category identifier, stored in wire byte order
///
/// The wire order is the reverse of the hex string wallets and explorers
/// display, which is what the covenant compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenCategory(pub [u8; 32]);

impl TokenCategory {
    /// Parse from the display hex form (the category as shown by explorers)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(TokenCategory(reversed(decode_fixed::<32>(
            hex_str,
            "token category",
        )?)))
    }

    /// Display hex form
    pub fn to_hex(&self) -> String {
        hex::encode(reversed(self.0))
    }

    /// Raw bytes in wire order
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build from wire-order bytes
    pub fn from_wire_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(BridgeError::Decoding(format!(
                "token category must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut result = [0u8; 32];
        result.copy_from_slice(bytes);
        Ok(TokenCategory(result))
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

macro_rules! serde_as_display_hex {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                <$ty>::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_as_display_hex!(TxId);
serde_as_display_hex!(TokenCategory);

// ============================================================================
// Token Data
// ============================================================================

/// NFT capability carried in the low nibble of the token bitfield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Immutable,
    Mutable,
    Minting,
}

impl Capability {
    pub fn to_byte(self) -> u8 {
        match self {
            Capability::Immutable => 0x00,
            Capability::Mutable => 0x01,
            Capability::Minting => 0x02,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Capability::Immutable),
            0x01 => Some(Capability::Mutable),
            0x02 => Some(Capability::Minting),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Immutable => "immutable",
            Capability::Mutable => "mutable",
            Capability::Minting => "minting",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fungible part of a token output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub capability: Capability,
    #[serde(with = "hex", default)]
    pub commitment: Vec<u8>,
}

/// Token data attached to an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub category: TokenCategory,
    /// Fungible amount (0 when the output only carries an NFT)
    #[serde(default)]
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft: Option<Nft>,
}

impl TokenData {
    /// Fungible-only token data
    pub fn fungible(category: TokenCategory, amount: u64) -> Self {
        Self {
            category,
            amount,
            nft: None,
        }
    }

    /// NFT-only token data
    pub fn nft(category: TokenCategory, capability: Capability, commitment: Vec<u8>) -> Self {
        Self {
            category,
            amount: 0,
            nft: Some(Nft {
                capability,
                commitment,
            }),
        }
    }

    /// Category as returned by covenant introspection
    ///
    /// 32 bytes for fungible tokens and immutable NFTs, 33 bytes (category
    /// followed by the capability byte) for mutable and minting NFTs.
    pub fn category_field(&self) -> Vec<u8> {
        let mut field = self.category.0.to_vec();
        if let Some(nft) = &self.nft {
            if nft.capability != Capability::Immutable {
                field.push(nft.capability.to_byte());
            }
        }
        field
    }

    pub fn capability(&self) -> Option<Capability> {
        self.nft.as_ref().map(|nft| nft.capability)
    }
}

// ============================================================================
// UTXOs
// ============================================================================

/// Reference to a previous transaction output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    pub txid: TxId,
    pub vout: u32,
}

impl Outpoint {
    pub fn new(txid: TxId, vout: u32) -> Self {
        Self { txid, vout }
    }

    /// Parse `<txid>:<vout>`
    pub fn parse(s: &str) -> Result<Self> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| BridgeError::Decoding(format!("outpoint '{}' must be txid:vout", s)))?;
        let vout = vout
            .parse::<u32>()
            .map_err(|_| BridgeError::Decoding(format!("invalid output index '{}'", vout)))?;
        Ok(Self::new(TxId::from_hex(txid)?, vout))
    }
}

impl fmt::Display for Outpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// An unspent output as returned by the chain-query collaborator
///
/// Immutable once fetched; a fresh query yields fresh values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: TxId,
    pub vout: u32,
    pub satoshis: u64,
    #[serde(with = "hex")]
    pub locking_bytecode: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenData>,
}

impl Utxo {
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.txid, self.vout)
    }

    /// Whether the output carries no token data at all
    pub fn is_plain(&self) -> bool {
        self.token.is_none()
    }
}

// ============================================================================
// Account-Chain Identifiers
// ============================================================================

/// Represents a 4-byte registered chain ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChainId(pub [u8; 4]);

impl ChainId {
    /// Create from u32
    pub fn from_u32(id: u32) -> Self {
        ChainId(id.to_be_bytes())
    }

    /// Convert to u32
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Create from hex string (with or without 0x prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Ok(ChainId(decode_fixed::<4>(hex_str, "chain id")?))
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u32())
    }
}

impl From<u32> for ChainId {
    fn from(id: u32) -> Self {
        ChainId::from_u32(id)
    }
}

/// EVM-style account address (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub [u8; 20]);

impl EvmAddress {
    /// Create from hex string (with or without 0x prefix)
    ///
    /// Accepts both 20-byte addresses and 32-byte left-padded addresses.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped)
            .map_err(|e| BridgeError::InvalidAddress(format!("invalid hex address: {}", e)))?;

        match bytes.len() {
            20 => {
                let mut result = [0u8; 20];
                result.copy_from_slice(&bytes);
                Ok(EvmAddress(result))
            }
            32 => {
                if bytes[..12].iter().any(|&b| b != 0) {
                    return Err(BridgeError::InvalidAddress(
                        "32-byte address has non-zero padding".to_string(),
                    ));
                }
                let mut result = [0u8; 20];
                result.copy_from_slice(&bytes[12..]);
                Ok(EvmAddress(result))
            }
            len => Err(BridgeError::InvalidAddress(format!(
                "EVM address must be 20 or 32 bytes, got {} bytes",
                len
            ))),
        }
    }

    /// Convert to hex string with 0x prefix
    pub fn as_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

/// Where an exit (UTXO side -> account side) should be credited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitDestination {
    pub chain: ChainId,
    pub account: EvmAddress,
}
