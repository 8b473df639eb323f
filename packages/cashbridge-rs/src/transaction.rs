//! Transaction wire format with CashTokens output prefixes
//!
//! Layout:
//! - Version (4 bytes, little-endian)
//! - Input count (VarInt)
//! - For each input: outpoint txid (32, wire order), outpoint index (4),
//!   unlocking bytecode length (VarInt) + bytes, sequence (4)
//! - Output count (VarInt)
//! - For each output: value (8), length (VarInt) of `token prefix || locking
//!   bytecode`, then those bytes
//! - Lock time (4 bytes, little-endian)
//!
//! Token prefix:
//! `0xef || category(32) || bitfield || [VarInt len || commitment] || [VarInt amount]`

use crate::error::{BridgeError, Result};
use crate::hash::hash256;
use crate::types::{Capability, Nft, Outpoint, TokenCategory, TokenData, TxId, Utxo};

/// Marker byte that introduces a token prefix inside an output's script field
pub const PREFIX_TOKEN: u8 = 0xef;

/// Longest NFT commitment the network accepts
pub const MAX_COMMITMENT_LEN: usize = 40;

/// Largest fungible amount the network accepts (i64::MAX)
pub const MAX_TOKEN_AMOUNT: u64 = i64::MAX as u64;

/// Sequence value that disables relative lock-time for an input
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

// Token bitfield
const HAS_AMOUNT: u8 = 0x10;
const HAS_NFT: u8 = 0x20;
const HAS_COMMITMENT: u8 = 0x40;
const RESERVED_BIT: u8 = 0x80;
const CAPABILITY_MASK: u8 = 0x0f;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub outpoint: Outpoint,
    pub unlocking_bytecode: Vec<u8>,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub locking_bytecode: Vec<u8>,
    pub token: Option<TokenData>,
}

impl From<&Utxo> for TxOutput {
    fn from(utxo: &Utxo) -> Self {
        TxOutput {
            value: utxo.satoshis,
            locking_bytecode: utxo.locking_bytecode.clone(),
            token: utxo.token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub locktime: u32,
}

impl Transaction {
    /// Serialize to wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode_transaction(self)
    }

    /// Transaction id (double SHA-256 of the serialization)
    pub fn txid(&self) -> Result<TxId> {
        Ok(TxId(hash256(&self.encode()?)))
    }
}

// ============================================================================
// VarInt
// ============================================================================

pub fn encode_varint(value: u64, out: &mut Vec<u8>) {
    if value < 0xfd {
        out.push(value as u8);
    } else if value <= 0xffff {
        out.push(0xfd);
        out.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        out.push(0xfe);
        out.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        out.push(0xff);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Forward-only cursor over a byte slice
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(BridgeError::Decoding(format!(
                "truncated {}: need {} bytes, have {}",
                what,
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32_le(&mut self, what: &str) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64_le(&mut self, what: &str) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn varint(&mut self, what: &str) -> Result<u64> {
        let first = self.u8(what)?;
        let (value, min) = match first {
            0xfd => {
                let mut buf = [0u8; 2];
                buf.copy_from_slice(self.take(2, what)?);
                (u16::from_le_bytes(buf) as u64, 0xfd)
            }
            0xfe => (self.u32_le(what)? as u64, 0x1_0000),
            0xff => (self.u64_le(what)?, 0x1_0000_0000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(BridgeError::Decoding(format!("non-canonical VarInt for {}", what)));
        }
        Ok(value)
    }

    fn var_bytes(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.varint(what)?;
        let len = usize::try_from(len)
            .map_err(|_| BridgeError::Decoding(format!("{} length overflows", what)))?;
        self.take(len, what)
    }
}

// ============================================================================
// Token Prefix
// ============================================================================

/// Serialize a token prefix, validating the same rules the network applies
pub fn encode_token_prefix(token: &TokenData, out: &mut Vec<u8>) -> Result<()> {
    if token.amount > MAX_TOKEN_AMOUNT {
        return Err(BridgeError::Encoding(format!(
            "token amount {} exceeds maximum",
            token.amount
        )));
    }
    if token.amount == 0 && token.nft.is_none() {
        return Err(BridgeError::Encoding(
            "token data must carry an amount or an NFT".to_string(),
        ));
    }

    let mut bitfield = 0u8;
    if token.amount > 0 {
        bitfield |= HAS_AMOUNT;
    }
    if let Some(nft) = &token.nft {
        if nft.commitment.len() > MAX_COMMITMENT_LEN {
            return Err(BridgeError::Encoding(format!(
                "commitment of {} bytes exceeds {}",
                nft.commitment.len(),
                MAX_COMMITMENT_LEN
            )));
        }
        bitfield |= HAS_NFT | nft.capability.to_byte();
        if !nft.commitment.is_empty() {
            bitfield |= HAS_COMMITMENT;
        }
    }

    out.push(PREFIX_TOKEN);
    out.extend_from_slice(token.category.as_bytes());
    out.push(bitfield);
    if let Some(nft) = &token.nft {
        if !nft.commitment.is_empty() {
            encode_varint(nft.commitment.len() as u64, out);
            out.extend_from_slice(&nft.commitment);
        }
    }
    if token.amount > 0 {
        encode_varint(token.amount, out);
    }
    Ok(())
}

fn decode_token_prefix(reader: &mut Reader<'_>) -> Result<TokenData> {
    let category = TokenCategory::from_wire_slice(reader.take(32, "token category")?)?;
    let bitfield = reader.u8("token bitfield")?;

    if bitfield & RESERVED_BIT != 0 {
        return Err(BridgeError::Decoding("token bitfield uses reserved bit".to_string()));
    }
    let has_nft = bitfield & HAS_NFT != 0;
    let has_commitment = bitfield & HAS_COMMITMENT != 0;
    let has_amount = bitfield & HAS_AMOUNT != 0;
    let capability_byte = bitfield & CAPABILITY_MASK;

    if !has_nft && (capability_byte != 0 || has_commitment) {
        return Err(BridgeError::Decoding(
            "capability or commitment without an NFT".to_string(),
        ));
    }
    if !has_nft && !has_amount {
        return Err(BridgeError::Decoding("token prefix carries nothing".to_string()));
    }

    let nft = if has_nft {
        let capability = Capability::from_byte(capability_byte).ok_or_else(|| {
            BridgeError::Decoding(format!("invalid capability {:#x}", capability_byte))
        })?;
        let commitment = if has_commitment {
            let commitment = reader.var_bytes("commitment")?;
            if commitment.is_empty() || commitment.len() > MAX_COMMITMENT_LEN {
                return Err(BridgeError::Decoding(format!(
                    "commitment length {} out of range",
                    commitment.len()
                )));
            }
            commitment.to_vec()
        } else {
            Vec::new()
        };
        Some(Nft {
            capability,
            commitment,
        })
    } else {
        None
    };

    let amount = if has_amount {
        let amount = reader.varint("token amount")?;
        if amount == 0 || amount > MAX_TOKEN_AMOUNT {
            return Err(BridgeError::Decoding(format!(
                "token amount {} out of range",
                amount
            )));
        }
        amount
    } else {
        0
    };

    Ok(TokenData {
        category,
        amount,
        nft,
    })
}

// ============================================================================
// Transaction
// ============================================================================

pub fn encode_output(output: &TxOutput, out: &mut Vec<u8>) -> Result<()> {
    let mut script = Vec::with_capacity(output.locking_bytecode.len() + 80);
    if let Some(token) = &output.token {
        encode_token_prefix(token, &mut script)?;
    }
    script.extend_from_slice(&output.locking_bytecode);

    out.extend_from_slice(&output.value.to_le_bytes());
    encode_varint(script.len() as u64, out);
    out.extend_from_slice(&script);
    Ok(())
}

pub fn encode_transaction(tx: &Transaction) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(
        10 + tx.inputs.len() * 150 + tx.outputs.len() * 120,
    );

    out.extend_from_slice(&tx.version.to_le_bytes());

    encode_varint(tx.inputs.len() as u64, &mut out);
    for input in &tx.inputs {
        out.extend_from_slice(input.outpoint.txid.as_bytes());
        out.extend_from_slice(&input.outpoint.vout.to_le_bytes());
        encode_varint(input.unlocking_bytecode.len() as u64, &mut out);
        out.extend_from_slice(&input.unlocking_bytecode);
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }

    encode_varint(tx.outputs.len() as u64, &mut out);
    for output in &tx.outputs {
        encode_output(output, &mut out)?;
    }

    out.extend_from_slice(&tx.locktime.to_le_bytes());
    Ok(out)
}

fn decode_output(reader: &mut Reader<'_>) -> Result<TxOutput> {
    let value = reader.u64_le("output value")?;
    let script = reader.var_bytes("output script")?;

    let mut inner = Reader::new(script);
    let token = if script.first() == Some(&PREFIX_TOKEN) {
        inner.pos = 1;
        Some(decode_token_prefix(&mut inner)?)
    } else {
        None
    };

    Ok(TxOutput {
        value,
        locking_bytecode: script[inner.pos..].to_vec(),
        token,
    })
}

pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction> {
    let mut reader = Reader::new(bytes);

    let version = reader.u32_le("version")?;

    let input_count = reader.varint("input count")?;
    // Each input takes at least 41 bytes; reject counts the buffer cannot hold
    if input_count > (reader.remaining() / 41) as u64 {
        return Err(BridgeError::Decoding(format!(
            "input count {} exceeds remaining data",
            input_count
        )));
    }
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let txid = TxId::from_wire_slice(reader.take(32, "outpoint txid")?)?;
        let vout = reader.u32_le("outpoint index")?;
        let unlocking_bytecode = reader.var_bytes("unlocking bytecode")?.to_vec();
        let sequence = reader.u32_le("sequence")?;
        inputs.push(TxInput {
            outpoint: Outpoint::new(txid, vout),
            unlocking_bytecode,
            sequence,
        });
    }

    let output_count = reader.varint("output count")?;
    if output_count > (reader.remaining() / 9) as u64 {
        return Err(BridgeError::Decoding(format!(
            "output count {} exceeds remaining data",
            output_count
        )));
    }
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        outputs.push(decode_output(&mut reader)?);
    }

    let locktime = reader.u32_le("locktime")?;

    if reader.remaining() != 0 {
        return Err(BridgeError::Decoding(format!(
            "{} trailing bytes after transaction",
            reader.remaining()
        )));
    }

    Ok(Transaction {
        version,
        inputs,
        outputs,
        locktime,
    })
}
