//! # Wire Codec
//!
//! Converts transactions to the framed binary form nodes accept, and back.
//!
//! ```text
//! envelope.rs  - Frame header, bincode options, signed-envelope structures
//! body.rs      - TransactionBody and the BodyData tagged union
//! ```
//!
//! Three frame kinds are accepted on decode, each with exactly one meaning:
//!
//! | Kind                | Payload                                    |
//! |---------------------|--------------------------------------------|
//! | `TransactionList`   | `Vec<WireTransaction>`, envelope-of-envelope |
//! | `SignedTransaction` | one `WireSignedTransaction`                 |
//! | `Body`              | one bare `TransactionBody`, unsigned        |
//!
//! Encoding always produces `TransactionList`. The other two exist for tools
//! that hand us a single signed entry or an unsigned body.

pub mod body;
pub mod envelope;

pub use body::{
    AccountAmountData, AccountCreateData, BodyData, FileAppendData, HookStoreData,
    NftTransferData, NodeCreateData, NodeDeleteData, NodeUpdateData, ScheduledBody,
    TokenTransferListData, TransactionBody, TransferData, WireEndpoint, WireHookCall,
};
pub use envelope::{
    encode_frame, frame, from_wire, to_wire, unframe, FrameKind, SignaturePair,
    WireSignedTransaction, WireTransaction,
};

use crate::error::{Error, Result};

/// One decoded (node, chunk) entry.
#[derive(Debug, Clone)]
pub struct DecodedEntry {
    pub body: TransactionBody,
    /// The exact bytes the signatures cover.
    pub body_bytes: Vec<u8>,
    pub signatures: Vec<SignaturePair>,
}

/// Builds the `WireSignedTransaction` bytes for one entry.
pub fn encode_signed(body_bytes: Vec<u8>, sig_map: Vec<SignaturePair>) -> Result<Vec<u8>> {
    to_wire(&WireSignedTransaction {
        body_bytes,
        sig_map,
    })
}

/// Frames a list of already-encoded signed transactions.
pub fn encode_transaction_list(signed_entries: Vec<Vec<u8>>) -> Result<Vec<u8>> {
    let list: Vec<WireTransaction> = signed_entries
        .into_iter()
        .map(|signed_transaction_bytes| WireTransaction {
            signed_transaction_bytes,
        })
        .collect();
    encode_frame(FrameKind::TransactionList, &list)
}

/// Parses any accepted frame into its entries, in wire order.
pub fn decode_entries(bytes: &[u8]) -> Result<Vec<DecodedEntry>> {
    let (kind, payload) = unframe(bytes)?;
    match kind {
        FrameKind::TransactionList => {
            let list: Vec<WireTransaction> = from_wire(payload)?;
            if list.is_empty() {
                return Err(Error::decoding("transaction list is empty"));
            }
            list.into_iter()
                .map(|entry| decode_signed(&entry.signed_transaction_bytes))
                .collect()
        }
        FrameKind::SignedTransaction => Ok(vec![decode_signed(payload)?]),
        FrameKind::Body => Ok(vec![DecodedEntry {
            body: from_wire(payload)?,
            body_bytes: payload.to_vec(),
            signatures: Vec::new(),
        }]),
    }
}

fn decode_signed(bytes: &[u8]) -> Result<DecodedEntry> {
    let signed: WireSignedTransaction = from_wire(bytes)?;
    Ok(DecodedEntry {
        body: from_wire(&signed.body_bytes)?,
        body_bytes: signed.body_bytes,
        signatures: signed.sig_map,
    })
}
