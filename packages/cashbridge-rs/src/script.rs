//! Script construction helpers
//!
//! Only the handful of script forms the bridge emits or inspects: data
//! pushes, standard P2PKH / P2SH locking bytecode, and `OP_RETURN` data
//! outputs.

use crate::error::{BridgeError, Result};

// ============================================================================
// Opcodes
// ============================================================================

/// OP_0 / OP_FALSE - Push empty array
pub const OP_0: u8 = 0x00;

/// OP_PUSHDATA1 - Next byte is the data length
pub const OP_PUSHDATA1: u8 = 0x4c;

/// OP_PUSHDATA2 - Next 2 bytes (little-endian) are the data length
pub const OP_PUSHDATA2: u8 = 0x4d;

/// OP_PUSHDATA4 - Next 4 bytes (little-endian) are the data length
pub const OP_PUSHDATA4: u8 = 0x4e;

/// OP_1NEGATE - Push -1
pub const OP_1NEGATE: u8 = 0x4f;

/// OP_1 / OP_TRUE - Push 1
pub const OP_1: u8 = 0x51;

/// OP_16 - Push 16
pub const OP_16: u8 = 0x60;

/// OP_RETURN - Marks an output as a provably unspendable data carrier
pub const OP_RETURN: u8 = 0x6a;

pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CHECKSIG: u8 = 0xac;

/// Largest push that fits in a single-byte length opcode
const MAX_DIRECT_PUSH: usize = 75;

// ============================================================================
// Builders
// ============================================================================

/// Minimal push of arbitrary data
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    if len <= MAX_DIRECT_PUSH {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}

/// Minimal push of a small non-negative number (function selectors)
pub fn push_number(n: u8) -> Vec<u8> {
    match n {
        0 => vec![OP_0],
        1..=16 => vec![OP_1 + n - 1],
        // Script numbers are sign-magnitude; 0x80 and above need a padding byte
        _ if n < 0x80 => vec![1, n],
        _ => vec![2, n, 0x00],
    }
}

/// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh(hash: &[u8; 20]) -> Vec<u8> {
    let mut out = Vec::with_capacity(25);
    out.extend_from_slice(&[OP_DUP, OP_HASH160, 20]);
    out.extend_from_slice(hash);
    out.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    out
}

/// `OP_HASH160 <20> OP_EQUAL`
pub fn p2sh20(hash: &[u8; 20]) -> Vec<u8> {
    let mut out = Vec::with_capacity(23);
    out.extend_from_slice(&[OP_HASH160, 20]);
    out.extend_from_slice(hash);
    out.push(OP_EQUAL);
    out
}

/// `OP_HASH256 <32> OP_EQUAL`
pub fn p2sh32(hash: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(35);
    out.extend_from_slice(&[OP_HASH256, 32]);
    out.extend_from_slice(hash);
    out.push(OP_EQUAL);
    out
}

/// `OP_RETURN <push>...`
pub fn op_return(pushes: &[&[u8]]) -> Vec<u8> {
    let mut out = vec![OP_RETURN];
    for data in pushes {
        out.extend(push_data(data));
    }
    out
}

// ============================================================================
// Parsing
// ============================================================================

/// A single parsed script element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptElement<'a> {
    Push(&'a [u8]),
    Op(u8),
}

/// Split a script into pushes and opcodes
pub fn parse(script: &[u8]) -> Result<Vec<ScriptElement<'_>>> {
    let mut elements = Vec::new();
    let mut pos = 0;

    while pos < script.len() {
        let opcode = script[pos];
        pos += 1;

        let len = match opcode {
            1..=0x4b => opcode as usize,
            OP_PUSHDATA1 => read_len(script, &mut pos, 1)?,
            OP_PUSHDATA2 => read_len(script, &mut pos, 2)?,
            OP_PUSHDATA4 => read_len(script, &mut pos, 4)?,
            _ => {
                elements.push(ScriptElement::Op(opcode));
                continue;
            }
        };

        let end = pos
            .checked_add(len)
            .filter(|end| *end <= script.len())
            .ok_or_else(|| BridgeError::Decoding(format!("push of {} bytes overruns script", len)))?;
        elements.push(ScriptElement::Push(&script[pos..end]));
        pos = end;
    }

    Ok(elements)
}

fn read_len(script: &[u8], pos: &mut usize, width: usize) -> Result<usize> {
    let bytes = script
        .get(*pos..*pos + width)
        .ok_or_else(|| BridgeError::Decoding("truncated push length".to_string()))?;
    *pos += width;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(bytes);
    Ok(u32::from_le_bytes(buf) as usize)
}

/// Data pushes of an `OP_RETURN` output, or `None` if the script is not one
pub fn op_return_payload(script: &[u8]) -> Option<Vec<&[u8]>> {
    if script.first() != Some(&OP_RETURN) {
        return None;
    }
    let elements = parse(&script[1..]).ok()?;
    elements
        .into_iter()
        .map(|element| match element {
            ScriptElement::Push(data) => Some(data),
            ScriptElement::Op(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_data_boundaries() {
        assert_eq!(push_data(&[0xab; 75])[0], 75);
        assert_eq!(&push_data(&[0xab; 76])[..2], &[OP_PUSHDATA1, 76]);
        assert_eq!(&push_data(&[0xab; 256])[..3], &[OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(push_data(&[]), vec![0x00]);
    }

    #[test]
    fn test_push_number() {
        assert_eq!(push_number(0), vec![OP_0]);
        assert_eq!(push_number(1), vec![OP_1]);
        assert_eq!(push_number(16), vec![OP_16]);
        assert_eq!(push_number(17), vec![1, 17]);
        assert_eq!(push_number(0x80), vec![2, 0x80, 0x00]);
    }

    #[test]
    fn test_standard_templates() {
        let hash = [0x11u8; 20];
        assert_eq!(
            hex::encode(p2pkh(&hash)),
            format!("76a914{}88ac", hex::encode(hash))
        );
        assert_eq!(hex::encode(p2sh20(&hash)), format!("a914{}87", hex::encode(hash)));
        let hash32 = [0x22u8; 32];
        assert_eq!(hex::encode(p2sh32(&hash32)), format!("aa20{}87", hex::encode(hash32)));
    }

    #[test]
    fn test_parse_pushes_and_ops() {
        let big = vec![0xcd; 300];
        let mut script = push_number(1);
        script.extend(push_data(&big));
        script.push(OP_CHECKSIG);

        let elements = parse(&script).unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0], ScriptElement::Op(OP_1));
        assert_eq!(elements[1], ScriptElement::Push(&big[..]));
        assert_eq!(elements[2], ScriptElement::Op(OP_CHECKSIG));
    }

    #[test]
    fn test_parse_rejects_overrun() {
        assert!(parse(&[5, 1, 2]).is_err());
        assert!(parse(&[OP_PUSHDATA2, 0x01]).is_err());
    }

    #[test]
    fn test_op_return_payload() {
        let script = op_return(&[&[0u8, 0, 0, 1][..], &[0xaa; 20][..]]);
        let payload = op_return_payload(&script).unwrap();
        assert_eq!(payload, vec![&[0u8, 0, 0, 1][..], &[0xaa; 20][..]]);

        assert!(op_return_payload(&p2pkh(&[0; 20])).is_none());
        assert!(op_return_payload(&[OP_RETURN, OP_CHECKSIG]).is_none());
    }
}
