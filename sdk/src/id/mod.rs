//! # Entity & Identity Model
//!
//! Value types that name things on the ledger: entities (`shard.realm.num`),
//! transactions, and hooks. No behavior beyond parsing, formatting, checksum
//! validation, and equality.
//!
//! ```text
//! entity.rs          - EntityId, LedgerId, checksum derivation, ValidateChecksums
//! transaction_id.rs  - Timestamp, TransactionId (+ per-chunk derivation)
//! hook.rs            - HookEntityId, HookId, HookCreationDetails, hook calls
//! ```

pub mod entity;
pub mod hook;
pub mod transaction_id;

pub use entity::{
    checksum, AccountId, ContractId, EntityId, FileId, LedgerId, NftId, TokenId,
    ValidateChecksums,
};
pub use hook::{
    EvmHook, EvmHookCall, FungibleHookCall, FungibleHookType, HookCreationDetails,
    HookCreationDetailsBuilder, HookEntityId, HookExtensionPoint, HookId, HookStorageUpdate,
    MappingEntry, NftHookCall, NftHookType,
};
pub use transaction_id::{Timestamp, TransactionId};
