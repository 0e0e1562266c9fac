//! Decoding bytes of unknown kind.
//!
//! The body data discriminator picks the variant. Adding a kind means one
//! variant here and one match arm in [`AnyTransaction::from_entries`].

use super::account_create::AccountCreateTransaction;
use super::file_append::FileAppendTransaction;
use super::hook_store::HookStoreTransaction;
use super::lifecycle::TransactionState;
use super::node_create::NodeCreateTransaction;
use super::node_delete::NodeDeleteTransaction;
use super::node_update::NodeUpdateTransaction;
use super::transfer::TransferTransaction;
use crate::client::Client;
use crate::codec::{decode_entries, BodyData, DecodedEntry};
use crate::error::{Error, Result};
use crate::execution::TransactionResponse;
use crate::id::{LedgerId, TransactionId};

/// A transaction whose concrete kind was decided at runtime.
#[derive(Debug, Clone)]
pub enum AnyTransaction {
    Transfer(TransferTransaction),
    FileAppend(FileAppendTransaction),
    AccountCreate(AccountCreateTransaction),
    NodeCreate(NodeCreateTransaction),
    NodeUpdate(NodeUpdateTransaction),
    NodeDelete(NodeDeleteTransaction),
    HookStore(HookStoreTransaction),
}

/// Forwards a method call to whichever variant is inside.
macro_rules! dispatch {
    ($self:expr, $tx:ident => $body:expr) => {
        match $self {
            AnyTransaction::Transfer($tx) => $body,
            AnyTransaction::FileAppend($tx) => $body,
            AnyTransaction::AccountCreate($tx) => $body,
            AnyTransaction::NodeCreate($tx) => $body,
            AnyTransaction::NodeUpdate($tx) => $body,
            AnyTransaction::NodeDelete($tx) => $body,
            AnyTransaction::HookStore($tx) => $body,
        }
    };
}

impl AnyTransaction {
    /// Decodes any supported transaction.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_entries(decode_entries(bytes)?)
    }

    fn from_entries(entries: Vec<DecodedEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Err(Error::decoding("no transaction entries"));
        };
        let kind = first.body.data.kind();
        if let Some(other) = entries.iter().find(|e| e.body.data.kind() != kind) {
            return Err(Error::decoding(format!(
                "transaction list mixes {kind} and {} entries",
                other.body.data.kind()
            )));
        }

        Ok(match &first.body.data {
            BodyData::CryptoTransfer(_) => Self::Transfer(TransferTransaction::from_entries(entries)?),
            BodyData::FileAppend(_) => Self::FileAppend(FileAppendTransaction::from_entries(entries)?),
            BodyData::CryptoCreateAccount(_) => {
                Self::AccountCreate(AccountCreateTransaction::from_entries(entries)?)
            }
            BodyData::NodeCreate(_) => Self::NodeCreate(NodeCreateTransaction::from_entries(entries)?),
            BodyData::NodeUpdate(_) => Self::NodeUpdate(NodeUpdateTransaction::from_entries(entries)?),
            BodyData::NodeDelete(_) => Self::NodeDelete(NodeDeleteTransaction::from_entries(entries)?),
            BodyData::HookStore(_) => Self::HookStore(HookStoreTransaction::from_entries(entries)?),
        })
    }

    /// Type name of the variant, e.g. `"TransferTransaction"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transfer(_) => "TransferTransaction",
            Self::FileAppend(_) => "FileAppendTransaction",
            Self::AccountCreate(_) => "AccountCreateTransaction",
            Self::NodeCreate(_) => "NodeCreateTransaction",
            Self::NodeUpdate(_) => "NodeUpdateTransaction",
            Self::NodeDelete(_) => "NodeDeleteTransaction",
            Self::HookStore(_) => "HookStoreTransaction",
        }
    }

    pub fn state(&self) -> TransactionState {
        dispatch!(self, tx => tx.state())
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        dispatch!(self, tx => tx.transaction_id())
    }

    pub fn chunk_count(&self) -> usize {
        dispatch!(self, tx => tx.chunk_count())
    }

    /// Number of (node, chunk) bodies. Zero for drafts.
    pub fn signable_body_count(&self) -> usize {
        if self.state() == TransactionState::Draft {
            return 0;
        }
        dispatch!(self, tx => tx.signable_node_bodies().map_or(0, |b| b.len()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        dispatch!(self, tx => tx.to_bytes())
    }

    pub fn to_canonical_string(&self) -> String {
        dispatch!(self, tx => tx.to_canonical_string())
    }

    pub fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        dispatch!(self, tx => tx.validate_checksums(ledger))
    }

    /// Executes whichever transaction is inside. See
    /// [`Transaction::execute`](super::Transaction::execute).
    pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
        dispatch!(self, tx => tx.execute(client).await)
    }
}

macro_rules! impl_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AnyTransaction {
                fn from(tx: $ty) -> Self {
                    Self::$variant(tx)
                }
            }
        )*
    };
}

impl_from! {
    Transfer => TransferTransaction,
    FileAppend => FileAppendTransaction,
    AccountCreate => AccountCreateTransaction,
    NodeCreate => NodeCreateTransaction,
    NodeUpdate => NodeUpdateTransaction,
    NodeDelete => NodeDeleteTransaction,
    HookStore => HookStoreTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_signed, encode_transaction_list, to_wire, TransactionBody};
    use crate::codec::{FileAppendData, NodeDeleteData};
    use crate::id::{AccountId, Timestamp};

    fn tx_id() -> TransactionId {
        TransactionId::new(AccountId::from_num(2), Timestamp::new(1_700_000_000, 0))
    }

    #[test]
    fn dispatches_on_the_body_variant() {
        let mut tx = NodeDeleteTransaction::new();
        tx.set_node_id(9).unwrap();
        tx.freeze_with(&[AccountId::from_num(3)], tx_id()).unwrap();

        let any = AnyTransaction::from_bytes(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(any.kind(), "NodeDeleteTransaction");
        assert_eq!(any.state(), TransactionState::Frozen);
        assert_eq!(any.signable_body_count(), 1);
        let AnyTransaction::NodeDelete(decoded) = any else {
            panic!("wrong variant");
        };
        assert_eq!(decoded.node_id().unwrap(), 9);
    }

    #[test]
    fn a_list_mixing_kinds_is_rejected() {
        let entry = |data| {
            let body = TransactionBody {
                transaction_id: Some(tx_id()),
                node_account_id: Some(AccountId::from_num(3)),
                transaction_fee: 1,
                valid_duration_secs: 120,
                memo: String::new(),
                data,
            };
            encode_signed(to_wire(&body).unwrap(), Vec::new()).unwrap()
        };
        let bytes = encode_transaction_list(vec![
            entry(BodyData::NodeDelete(NodeDeleteData { node_id: Some(1) })),
            entry(BodyData::FileAppend(FileAppendData {
                file_id: None,
                contents: vec![],
            })),
        ])
        .unwrap();
        assert!(matches!(
            AnyTransaction::from_bytes(&bytes),
            Err(Error::Decoding(_))
        ));
    }

    #[test]
    fn non_chunked_kind_with_two_chunk_ids_is_rejected() {
        let entry = |chunk: usize| {
            let body = TransactionBody {
                transaction_id: Some(tx_id().for_chunk(chunk)),
                node_account_id: Some(AccountId::from_num(3)),
                transaction_fee: 1,
                valid_duration_secs: 120,
                memo: String::new(),
                data: BodyData::NodeDelete(NodeDeleteData { node_id: Some(1) }),
            };
            encode_signed(to_wire(&body).unwrap(), Vec::new()).unwrap()
        };
        let bytes = encode_transaction_list(vec![entry(0), entry(1)]).unwrap();
        let err = AnyTransaction::from_bytes(&bytes).unwrap_err();
        assert!(err
            .to_string()
            .contains("does not support chunking but 2 chunks were found"));
    }
}
