//! # Hooks
//!
//! Hooks are EVM programs the network runs on an account's behalf, for
//! example to approve an allowance-style transfer without a signature.
//!
//! This module holds the value types: who owns a hook ([`HookEntityId`]), how
//! to name one ([`HookId`]), how to install one ([`HookCreationDetails`]), how
//! to seed or edit its storage ([`HookStorageUpdate`]), and how a transfer
//! invokes one ([`FungibleHookCall`], [`NftHookCall`]).
//!
//! The call types carry a *hook type* that decides which wire slot the call is
//! encoded into. Decoding reads the populated slot back into the type, so a
//! round trip always lands the call where it started.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::{AccountId, ContractId, LedgerId, ValidateChecksums};
use crate::config;
use crate::crypto::PublicKey;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The entity a hook belongs to. Exactly one variant, always.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookEntityId {
    Account(AccountId),
    Contract(ContractId),
}

impl HookEntityId {
    pub fn is_account(&self) -> bool {
        matches!(self, Self::Account(_))
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// The owning account, or `None` if a contract owns the hook.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            Self::Account(id) => Some(id),
            Self::Contract(_) => None,
        }
    }

    /// The owning contract, or `None` if an account owns the hook.
    pub fn contract_id(&self) -> Option<&ContractId> {
        match self {
            Self::Contract(id) => Some(id),
            Self::Account(_) => None,
        }
    }
}

impl ValidateChecksums for HookEntityId {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        match self {
            Self::Account(id) | Self::Contract(id) => id.validate_checksum(ledger),
        }
    }
}

impl fmt::Display for HookEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account {id}"),
            Self::Contract(id) => write!(f, "contract {id}"),
        }
    }
}

/// A hook, named by its owner and the owner-local hook number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HookId {
    pub entity_id: HookEntityId,
    pub hook_id: u64,
}

impl HookId {
    pub fn new(entity_id: HookEntityId, hook_id: u64) -> Self {
        Self { entity_id, hook_id }
    }
}

impl ValidateChecksums for HookId {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.entity_id.validate_checksums(ledger)
    }
}

// ---------------------------------------------------------------------------
// Storage updates
// ---------------------------------------------------------------------------

/// One key/value pair inside a Solidity mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A write into a hook's EVM storage.
///
/// Keys and values are big-endian words of at most 32 bytes. An empty value
/// clears the slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookStorageUpdate {
    /// Write a single storage slot.
    StorageSlot { key: Vec<u8>, value: Vec<u8> },
    /// Write entries of the mapping rooted at `mapping_slot`.
    MappingEntries {
        mapping_slot: Vec<u8>,
        entries: Vec<MappingEntry>,
    },
}

impl HookStorageUpdate {
    pub fn storage_slot(key: Vec<u8>, value: Vec<u8>) -> Result<Self> {
        check_word("storage slot key", &key)?;
        check_word("storage slot value", &value)?;
        Ok(Self::StorageSlot { key, value })
    }

    pub fn mapping_entries(mapping_slot: Vec<u8>, entries: Vec<MappingEntry>) -> Result<Self> {
        check_word("mapping slot", &mapping_slot)?;
        for entry in &entries {
            check_word("mapping entry key", &entry.key)?;
            check_word("mapping entry value", &entry.value)?;
        }
        Ok(Self::MappingEntries {
            mapping_slot,
            entries,
        })
    }
}

fn check_word(what: &str, bytes: &[u8]) -> Result<()> {
    if bytes.len() > config::MAX_STORAGE_SLOT_BYTES {
        return Err(Error::argument(format!(
            "{what} must not exceed {} bytes",
            config::MAX_STORAGE_SLOT_BYTES
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// Where in the network's processing a hook plugs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookExtensionPoint {
    /// Consulted when a transfer debits the owner without the owner's signature.
    AccountAllowanceHook,
}

/// A hook implemented by an EVM contract, plus its initial storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvmHook {
    pub contract_id: ContractId,
    pub storage_updates: Vec<HookStorageUpdate>,
}

impl EvmHook {
    pub fn new(contract_id: ContractId) -> Self {
        Self {
            contract_id,
            storage_updates: Vec::new(),
        }
    }

    pub fn with_storage_updates(mut self, updates: Vec<HookStorageUpdate>) -> Self {
        self.storage_updates = updates;
        self
    }
}

/// Everything needed to install a hook on an account or contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookCreationDetails {
    pub extension_point: HookExtensionPoint,
    pub hook_id: u64,
    pub hook: EvmHook,
    pub admin_key: Option<PublicKey>,
}

impl HookCreationDetails {
    pub fn new(extension_point: HookExtensionPoint, hook_id: u64, hook: EvmHook) -> Self {
        Self {
            extension_point,
            hook_id,
            hook,
            admin_key: None,
        }
    }

    pub fn with_admin_key(mut self, key: PublicKey) -> Self {
        self.admin_key = Some(key);
        self
    }

    /// Builder for callers assembling details piecemeal (e.g. from config).
    pub fn builder() -> HookCreationDetailsBuilder {
        HookCreationDetailsBuilder::default()
    }
}

impl ValidateChecksums for HookCreationDetails {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.hook.contract_id.validate_checksum(ledger)
    }
}

/// Piecemeal construction of [`HookCreationDetails`]. `build` fails if the
/// extension point or the hook was never supplied.
#[derive(Debug, Default)]
pub struct HookCreationDetailsBuilder {
    extension_point: Option<HookExtensionPoint>,
    hook_id: u64,
    hook: Option<EvmHook>,
    admin_key: Option<PublicKey>,
}

impl HookCreationDetailsBuilder {
    pub fn extension_point(mut self, point: HookExtensionPoint) -> Self {
        self.extension_point = Some(point);
        self
    }

    pub fn hook_id(mut self, hook_id: u64) -> Self {
        self.hook_id = hook_id;
        self
    }

    pub fn hook(mut self, hook: EvmHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn admin_key(mut self, key: PublicKey) -> Self {
        self.admin_key = Some(key);
        self
    }

    pub fn build(self) -> Result<HookCreationDetails> {
        let extension_point = self
            .extension_point
            .ok_or_else(|| Error::argument("extensionPoint cannot be null"))?;
        let hook = self
            .hook
            .ok_or_else(|| Error::argument("hook cannot be null"))?;
        Ok(HookCreationDetails {
            extension_point,
            hook_id: self.hook_id,
            hook,
            admin_key: self.admin_key,
        })
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Calldata and gas for invoking an EVM hook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvmHookCall {
    pub data: Vec<u8>,
    pub gas_limit: u64,
}

impl EvmHookCall {
    pub fn new(data: Vec<u8>, gas_limit: u64) -> Self {
        Self { data, gas_limit }
    }
}

/// When a fungible (HBAR or token) transfer hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FungibleHookType {
    /// Once, before the transfer executes.
    PreTxAllowanceHook,
    /// Before and after the transfer executes.
    PrePostTxAllowanceHook,
}

/// A hook call attached to a fungible transfer entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FungibleHookCall {
    pub hook_id: u64,
    pub evm_hook_call: EvmHookCall,
    pub hook_type: FungibleHookType,
}

impl FungibleHookCall {
    pub fn new(hook_id: u64, evm_hook_call: EvmHookCall, hook_type: FungibleHookType) -> Self {
        Self {
            hook_id,
            evm_hook_call,
            hook_type,
        }
    }
}

/// When, and on whose side, an NFT transfer hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NftHookType {
    PreHookSender,
    PrePostHookSender,
    PreHookReceiver,
    PrePostHookReceiver,
}

impl NftHookType {
    pub fn is_sender(self) -> bool {
        matches!(self, Self::PreHookSender | Self::PrePostHookSender)
    }

    pub fn is_receiver(self) -> bool {
        !self.is_sender()
    }
}

/// A hook call attached to one side of an NFT transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NftHookCall {
    pub hook_id: u64,
    pub evm_hook_call: EvmHookCall,
    pub hook_type: NftHookType,
}

impl NftHookCall {
    pub fn new(hook_id: u64, evm_hook_call: EvmHookCall, hook_type: NftHookType) -> Self {
        Self {
            hook_id,
            evm_hook_call,
            hook_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PrivateKey;

    #[test]
    fn test_hook_entity_id_accessors() {
        let account = HookEntityId::Account(AccountId::from_num(7));
        assert!(account.is_account());
        assert!(!account.is_contract());
        assert_eq!(account.account_id(), Some(&AccountId::from_num(7)));
        assert_eq!(account.contract_id(), None);

        let contract = HookEntityId::Contract(ContractId::from_num(9));
        assert!(contract.is_contract());
        assert_eq!(contract.account_id(), None);
        assert_eq!(contract.contract_id(), Some(&ContractId::from_num(9)));
    }

    #[test]
    fn test_hook_id_value_equality() {
        let a = HookId::new(HookEntityId::Account(AccountId::from_num(1)), 4);
        let b = HookId::new(HookEntityId::Account(AccountId::from_num(1)), 4);
        let c = HookId::new(HookEntityId::Contract(AccountId::from_num(1)), 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_builder_requires_extension_point_and_hook() {
        let err = HookCreationDetails::builder()
            .hook(EvmHook::new(ContractId::from_num(1)))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "extensionPoint cannot be null");

        let err = HookCreationDetails::builder()
            .extension_point(HookExtensionPoint::AccountAllowanceHook)
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "hook cannot be null");
    }

    #[test]
    fn test_creation_details_equality_covers_admin_key() {
        let base = HookCreationDetails::new(
            HookExtensionPoint::AccountAllowanceHook,
            1,
            EvmHook::new(ContractId::from_num(10)),
        );
        let keyed = base
            .clone()
            .with_admin_key(PrivateKey::from_seed(&[1u8; 32]).public_key());
        assert_ne!(base, keyed);

        let built = HookCreationDetails::builder()
            .extension_point(HookExtensionPoint::AccountAllowanceHook)
            .hook_id(1)
            .hook(EvmHook::new(ContractId::from_num(10)))
            .build()
            .unwrap();
        assert_eq!(built, base);
    }

    #[test]
    fn test_storage_words_are_capped_at_32_bytes() {
        assert!(HookStorageUpdate::storage_slot(vec![1; 32], vec![2; 32]).is_ok());
        let err = HookStorageUpdate::storage_slot(vec![1; 33], vec![]).unwrap_err();
        assert_eq!(err.to_string(), "storage slot key must not exceed 32 bytes");

        let entries = vec![MappingEntry {
            key: vec![0; 4],
            value: vec![0; 40],
        }];
        assert!(HookStorageUpdate::mapping_entries(vec![0], entries).is_err());
    }

    #[test]
    fn test_nft_hook_type_sides() {
        assert!(NftHookType::PreHookSender.is_sender());
        assert!(NftHookType::PrePostHookSender.is_sender());
        assert!(NftHookType::PreHookReceiver.is_receiver());
        assert!(NftHookType::PrePostHookReceiver.is_receiver());
    }

    #[test]
    fn test_checksum_validation_covers_hook_owner() {
        let ledger = LedgerId::Testnet;
        let bad: AccountId = "0.0.123-ntjli".parse().unwrap();
        let hook_id = HookId::new(HookEntityId::Account(bad), 1);
        assert!(matches!(
            hook_id.validate_checksums(&ledger),
            Err(Error::BadEntityId { .. })
        ));
    }
}
