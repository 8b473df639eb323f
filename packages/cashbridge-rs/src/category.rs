//! Category registry
//!
//! The bridge knows exactly two token categories: the reserve category (the
//! fungible token pooled in the bridge contract) and the claim category (the
//! immutable NFTs the Issuer mints). Both are parsed once at start-up from
//! their display hex and handed to every component that needs them; nothing
//! mutates the registry afterwards.

use crate::error::{BridgeError, Result};
use crate::types::TokenCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRegistry {
    reserve: TokenCategory,
    claim: TokenCategory,
}

impl CategoryRegistry {
    pub fn new(reserve: TokenCategory, claim: TokenCategory) -> Self {
        Self { reserve, claim }
    }

    /// Build from the two display-order hex strings found in configuration
    pub fn from_hex(reserve_hex: &str, claim_hex: &str) -> Result<Self> {
        let reserve = TokenCategory::from_hex(reserve_hex)?;
        let claim = TokenCategory::from_hex(claim_hex)?;
        if reserve == claim {
            return Err(BridgeError::Decoding(
                "reserve and claim categories must differ".to_string(),
            ));
        }
        Ok(Self { reserve, claim })
    }

    /// Reserve category in wire order
    pub fn reserve_category(&self) -> TokenCategory {
        self.reserve
    }

    /// Claim category in wire order
    pub fn claim_category(&self) -> TokenCategory {
        self.claim
    }
}

/// Drop the trailing capability byte from an introspected category field
///
/// Mutable and minting NFTs report a 33-byte category (category followed by
/// the capability). 32-byte fields are returned as-is.
pub fn strip_capability(field: &[u8]) -> Result<TokenCategory> {
    match field.len() {
        32 => TokenCategory::from_wire_slice(field),
        33 => TokenCategory::from_wire_slice(&field[..32]),
        len => Err(BridgeError::Decoding(format!(
            "category field must be 32 or 33 bytes, got {}",
            len
        ))),
    }
}
