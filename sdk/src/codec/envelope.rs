//! Length-framed envelopes and the signed-transaction wire structures.
//!
//! ```text
//! +-------+---------+------+-------------+----------------------+
//! | magic | version | kind | len (u32LE) | bincode payload      |
//! | 4B    | 1B      | 1B   | 4B          | len bytes            |
//! +-------+---------+------+-------------+----------------------+
//! ```
//!
//! The kind byte is authoritative. We never sniff the payload to guess what
//! it might be, so a given byte string has exactly one interpretation or none.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_WIRE_MESSAGE_SIZE, WIRE_MAGIC, WIRE_VERSION};
use crate::crypto::PublicKey;
use crate::error::{Error, Result};

/// Magic + version + kind + length.
pub const FRAME_HEADER_LEN: usize = 4 + 1 + 1 + 4;

// ---------------------------------------------------------------------------
// Frame Kind
// ---------------------------------------------------------------------------

/// What the frame payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// `Vec<WireTransaction>`: one entry per (node, chunk) pair.
    TransactionList = 1,
    /// A single [`WireSignedTransaction`].
    SignedTransaction = 2,
    /// A bare [`TransactionBody`](super::TransactionBody), no signatures.
    Body = 3,
}

impl TryFrom<u8> for FrameKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::TransactionList),
            2 => Ok(Self::SignedTransaction),
            3 => Ok(Self::Body),
            other => Err(Error::decoding(format!("unknown frame kind {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire Structures
// ---------------------------------------------------------------------------

/// One signer's signature over a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePair {
    pub public_key: PublicKey,
    pub signature: Vec<u8>,
}

/// Body bytes plus every signature collected for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSignedTransaction {
    /// bincode-encoded `TransactionBody`. Signatures cover exactly these bytes.
    pub body_bytes: Vec<u8>,
    pub sig_map: Vec<SignaturePair>,
}

/// Outer envelope around a signed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    /// bincode-encoded [`WireSignedTransaction`].
    pub signed_transaction_bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// bincode
// ---------------------------------------------------------------------------

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_WIRE_MESSAGE_SIZE)
        .reject_trailing_bytes()
}

/// Serializes `value` with the wire bincode options.
pub fn to_wire<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    options()
        .serialize(value)
        .map_err(|e| Error::Encoding(e.to_string()))
}

/// Deserializes `bytes` with the wire bincode options. Trailing bytes fail.
pub fn from_wire<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    options()
        .deserialize(bytes)
        .map_err(|e| Error::decoding(e.to_string()))
}

// ---------------------------------------------------------------------------
// Framing
// ---------------------------------------------------------------------------

/// Wraps an already-encoded payload in a frame header.
pub fn frame(kind: FrameKind, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() as u64 > MAX_WIRE_MESSAGE_SIZE {
        return Err(Error::Encoding(format!(
            "payload of {} bytes exceeds the {MAX_WIRE_MESSAGE_SIZE} byte frame limit",
            payload.len()
        )));
    }
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    out.extend_from_slice(&WIRE_MAGIC);
    out.push(WIRE_VERSION);
    out.push(kind as u8);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Encodes `value` and frames it as `kind`.
pub fn encode_frame<T: Serialize + ?Sized>(kind: FrameKind, value: &T) -> Result<Vec<u8>> {
    frame(kind, &to_wire(value)?)
}

/// Validates the header and returns the frame kind plus its payload.
pub fn unframe(bytes: &[u8]) -> Result<(FrameKind, &[u8])> {
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(Error::decoding(format!(
            "frame of {} bytes is shorter than the {FRAME_HEADER_LEN} byte header",
            bytes.len()
        )));
    }
    if bytes[..4] != WIRE_MAGIC {
        return Err(Error::decoding("bad magic"));
    }
    if bytes[4] != WIRE_VERSION {
        return Err(Error::decoding(format!(
            "unsupported wire version {} (expected {WIRE_VERSION})",
            bytes[4]
        )));
    }
    let kind = FrameKind::try_from(bytes[5])?;

    let mut len = [0u8; 4];
    len.copy_from_slice(&bytes[6..FRAME_HEADER_LEN]);
    let len = u32::from_le_bytes(len) as usize;

    let payload = &bytes[FRAME_HEADER_LEN..];
    if payload.len() != len {
        return Err(Error::decoding(format!(
            "frame declares {len} payload bytes but carries {}",
            payload.len()
        )));
    }
    Ok((kind, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_header_layout() {
        let bytes = frame(FrameKind::Body, &[0xAA, 0xBB]).unwrap();
        assert_eq!(&bytes[..4], b"LSDK");
        assert_eq!(bytes[4], WIRE_VERSION);
        assert_eq!(bytes[5], 3);
        assert_eq!(&bytes[6..10], &2u32.to_le_bytes());
        assert_eq!(&bytes[10..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_unframe_recovers_kind_and_payload() {
        let bytes = frame(FrameKind::SignedTransaction, b"payload").unwrap();
        let (kind, payload) = unframe(&bytes).unwrap();
        assert_eq!(kind, FrameKind::SignedTransaction);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn test_unframe_rejects_bad_headers() {
        let good = frame(FrameKind::TransactionList, b"abc").unwrap();

        let mut bad_magic = good.clone();
        bad_magic[0] = b'X';
        assert!(matches!(unframe(&bad_magic), Err(Error::Decoding(_))));

        let mut bad_version = good.clone();
        bad_version[4] = 99;
        assert!(matches!(unframe(&bad_version), Err(Error::Decoding(_))));

        let mut bad_kind = good.clone();
        bad_kind[5] = 42;
        assert!(matches!(unframe(&bad_kind), Err(Error::Decoding(_))));

        let mut trailing = good.clone();
        trailing.push(0);
        assert!(matches!(unframe(&trailing), Err(Error::Decoding(_))));

        assert!(matches!(unframe(&good[..5]), Err(Error::Decoding(_))));
        assert!(matches!(unframe(&[]), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_from_wire_rejects_trailing_bytes() {
        let mut bytes = to_wire(&7u32).unwrap();
        bytes.push(0xFF);
        assert!(matches!(from_wire::<u32>(&bytes), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_fixint_encoding_is_little_endian() {
        assert_eq!(to_wire(&1u32).unwrap(), vec![1, 0, 0, 0]);
    }
}
