//! Writes into a hook's EVM storage.
//!
//! Storage writes race with the hook itself, so the network refuses to
//! schedule them. [`HookStoreTransaction::schedule`] fails accordingly.

use super::chunk::ChunkRange;
use super::lifecycle::{single_chunk, unexpected_body, Transaction, TransactionData};
use crate::codec::{BodyData, HookStoreData};
use crate::error::Result;
use crate::id::{HookId, HookStorageUpdate, LedgerId, ValidateChecksums};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookStore {
    pub hook_id: Option<HookId>,
    pub storage_updates: Vec<HookStorageUpdate>,
}

pub type HookStoreTransaction = Transaction<HookStore>;

impl Transaction<HookStore> {
    pub fn set_hook_id(&mut self, hook_id: HookId) -> Result<&mut Self> {
        self.data_mut()?.hook_id = Some(hook_id);
        Ok(self)
    }

    pub fn add_storage_update(&mut self, update: HookStorageUpdate) -> Result<&mut Self> {
        self.data_mut()?.storage_updates.push(update);
        Ok(self)
    }

    pub fn set_storage_updates(&mut self, updates: Vec<HookStorageUpdate>) -> Result<&mut Self> {
        self.data_mut()?.storage_updates = updates;
        Ok(self)
    }

    pub fn hook_id(&self) -> Option<&HookId> {
        self.data().hook_id.as_ref()
    }

    pub fn storage_updates(&self) -> &[HookStorageUpdate] {
        &self.data().storage_updates
    }
}

impl ValidateChecksums for HookStore {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.hook_id.validate_checksums(ledger)
    }
}

impl TransactionData for HookStore {
    const NAME: &'static str = "HookStoreTransaction";

    fn body_data(&self, _chunk: &ChunkRange) -> Result<BodyData> {
        Ok(BodyData::HookStore(HookStoreData {
            hook_id: self.hook_id.clone(),
            storage_updates: self.storage_updates.clone(),
        }))
    }

    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        match single_chunk::<Self>(chunks)? {
            BodyData::HookStore(data) => Ok(Self {
                hook_id: data.hook_id,
                storage_updates: data.storage_updates,
            }),
            other => Err(unexpected_body::<Self>(&other)),
        }
    }

    fn is_schedulable(&self) -> bool {
        false
    }
}
