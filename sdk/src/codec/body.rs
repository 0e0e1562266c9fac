//! Transaction bodies: the part of a transaction that gets signed.
//!
//! [`BodyData`] is a closed tagged union with one variant per transaction
//! kind. bincode writes the variant index first, so an index we don't know
//! fails decoding instead of turning into the wrong type.
//!
//! The `*Data` structs are the wire schema, deliberately flat and dumb. Typed
//! application structures (hook calls with their slot type, endpoint
//! validation, chunk reassembly) live with the concrete transactions, which
//! convert to and from these.

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::id::{
    AccountId, EvmHookCall, FileId, HookCreationDetails, HookId, HookStorageUpdate, TokenId,
    TransactionId,
};

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// The signed portion of one (node, chunk) entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Absent only for never-frozen transactions encoded as drafts.
    pub transaction_id: Option<TransactionId>,
    /// The node this entry is addressed to. Absent for drafts.
    pub node_account_id: Option<AccountId>,
    pub transaction_fee: u64,
    pub valid_duration_secs: u64,
    pub memo: String,
    pub data: BodyData,
}

/// One variant per supported transaction kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyData {
    CryptoTransfer(TransferData),
    FileAppend(FileAppendData),
    CryptoCreateAccount(AccountCreateData),
    NodeCreate(NodeCreateData),
    NodeUpdate(NodeUpdateData),
    NodeDelete(NodeDeleteData),
    HookStore(HookStoreData),
}

impl BodyData {
    /// Short name of the variant, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CryptoTransfer(_) => "CryptoTransfer",
            Self::FileAppend(_) => "FileAppend",
            Self::CryptoCreateAccount(_) => "CryptoCreateAccount",
            Self::NodeCreate(_) => "NodeCreate",
            Self::NodeUpdate(_) => "NodeUpdate",
            Self::NodeDelete(_) => "NodeDelete",
            Self::HookStore(_) => "HookStore",
        }
    }
}

/// Body data wrapped for inclusion in a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledBody {
    pub transaction_fee: u64,
    pub memo: String,
    pub data: BodyData,
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

/// A hook invocation as it sits in a transfer slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireHookCall {
    pub hook_id: u64,
    pub evm_hook_call: EvmHookCall,
}

/// Signed amount moved in or out of one account. At most one hook slot may
/// be populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAmountData {
    pub account_id: AccountId,
    pub amount: i64,
    pub is_approval: bool,
    pub pre_tx_allowance_hook: Option<WireHookCall>,
    pub pre_post_tx_allowance_hook: Option<WireHookCall>,
}

/// One NFT changing hands. At most one sender slot and one receiver slot may
/// be populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransferData {
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub serial_number: u64,
    pub is_approval: bool,
    pub pre_tx_sender_allowance_hook: Option<WireHookCall>,
    pub pre_post_tx_sender_allowance_hook: Option<WireHookCall>,
    pub pre_tx_receiver_allowance_hook: Option<WireHookCall>,
    pub pre_post_tx_receiver_allowance_hook: Option<WireHookCall>,
}

/// All movements for one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferListData {
    pub token_id: TokenId,
    pub expected_decimals: Option<u32>,
    pub transfers: Vec<AccountAmountData>,
    pub nft_transfers: Vec<NftTransferData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferData {
    pub hbar_transfers: Vec<AccountAmountData>,
    pub token_transfers: Vec<TokenTransferListData>,
}

// ---------------------------------------------------------------------------
// Files & Accounts
// ---------------------------------------------------------------------------

/// One chunk of a file append. `contents` is this chunk's slice only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAppendData {
    pub file_id: Option<FileId>,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreateData {
    pub key: Option<PublicKey>,
    pub initial_balance: u64,
    pub memo: String,
    pub hook_creation_details: Vec<HookCreationDetails>,
}

// ---------------------------------------------------------------------------
// Node Management
// ---------------------------------------------------------------------------

/// A network endpoint. An empty `ip_address_v4` means "no address".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEndpoint {
    pub ip_address_v4: Vec<u8>,
    pub domain_name: String,
    pub port: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCreateData {
    pub account_id: Option<AccountId>,
    pub description: String,
    pub gossip_endpoints: Vec<WireEndpoint>,
    pub service_endpoints: Vec<WireEndpoint>,
    pub gossip_ca_certificate: Vec<u8>,
    pub grpc_certificate_hash: Vec<u8>,
    pub admin_key: Option<PublicKey>,
    pub decline_reward: bool,
    pub grpc_web_proxy_endpoint: Option<WireEndpoint>,
}

/// Absent fields mean "leave unchanged". `node_id` is only absent in drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdateData {
    pub node_id: Option<u64>,
    pub account_id: Option<AccountId>,
    pub description: Option<String>,
    pub gossip_endpoints: Vec<WireEndpoint>,
    pub service_endpoints: Vec<WireEndpoint>,
    pub gossip_ca_certificate: Option<Vec<u8>>,
    pub grpc_certificate_hash: Option<Vec<u8>>,
    pub admin_key: Option<PublicKey>,
    pub decline_reward: Option<bool>,
    pub grpc_web_proxy_endpoint: Option<WireEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDeleteData {
    pub node_id: Option<u64>,
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStoreData {
    pub hook_id: Option<HookId>,
    pub storage_updates: Vec<HookStorageUpdate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::envelope::{from_wire, to_wire};
    use crate::error::Error;

    fn body(data: BodyData) -> TransactionBody {
        TransactionBody {
            transaction_id: None,
            node_account_id: Some(AccountId::from_num(3)),
            transaction_fee: 100,
            valid_duration_secs: 120,
            memo: "hi".into(),
            data,
        }
    }

    #[test]
    fn test_body_survives_bincode() {
        let original = body(BodyData::NodeDelete(NodeDeleteData { node_id: Some(7) }));
        let bytes = to_wire(&original).unwrap();
        let decoded: TransactionBody = from_wire(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_unknown_variant_index_fails() {
        let mut bytes = to_wire(&BodyData::NodeDelete(NodeDeleteData { node_id: Some(1) })).unwrap();
        // Variant index is the leading u32 with fixint encoding.
        bytes[..4].copy_from_slice(&999u32.to_le_bytes());
        assert!(matches!(from_wire::<BodyData>(&bytes), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            BodyData::FileAppend(FileAppendData {
                file_id: None,
                contents: vec![]
            })
            .kind(),
            "FileAppend"
        );
        assert_eq!(
            BodyData::HookStore(HookStoreData {
                hook_id: None,
                storage_updates: vec![]
            })
            .kind(),
            "HookStore"
        );
    }
}
