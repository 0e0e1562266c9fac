//! Creates an account, optionally installing hooks on it at birth.

use super::chunk::ChunkRange;
use super::lifecycle::{single_chunk, unexpected_body, Transaction, TransactionData};
use crate::codec::{AccountCreateData, BodyData};
use crate::config;
use crate::crypto::PublicKey;
use crate::error::{Error, Result};
use crate::id::{HookCreationDetails, LedgerId, ValidateChecksums};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountCreate {
    pub key: Option<PublicKey>,
    /// Tinybars moved from the payer into the new account.
    pub initial_balance: u64,
    pub account_memo: String,
    pub hooks: Vec<HookCreationDetails>,
}

pub type AccountCreateTransaction = Transaction<AccountCreate>;

impl Transaction<AccountCreate> {
    pub fn set_key(&mut self, key: PublicKey) -> Result<&mut Self> {
        self.data_mut()?.key = Some(key);
        Ok(self)
    }

    pub fn set_initial_balance(&mut self, tinybars: u64) -> Result<&mut Self> {
        self.data_mut()?.initial_balance = tinybars;
        Ok(self)
    }

    pub fn set_account_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        let memo = memo.into();
        if memo.len() > config::MAX_MEMO_BYTES {
            return Err(Error::argument(format!(
                "account memo must not exceed {} bytes when encoded as UTF-8",
                config::MAX_MEMO_BYTES
            )));
        }
        self.data_mut()?.account_memo = memo;
        Ok(self)
    }

    pub fn add_hook(&mut self, hook: HookCreationDetails) -> Result<&mut Self> {
        self.data_mut()?.hooks.push(hook);
        Ok(self)
    }

    pub fn set_hooks(&mut self, hooks: Vec<HookCreationDetails>) -> Result<&mut Self> {
        self.data_mut()?.hooks = hooks;
        Ok(self)
    }

    pub fn key(&self) -> Option<&PublicKey> {
        self.data().key.as_ref()
    }

    pub fn hooks(&self) -> &[HookCreationDetails] {
        &self.data().hooks
    }
}

impl ValidateChecksums for AccountCreate {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.hooks.validate_checksums(ledger)
    }
}

impl TransactionData for AccountCreate {
    const NAME: &'static str = "AccountCreateTransaction";

    fn body_data(&self, _chunk: &ChunkRange) -> Result<BodyData> {
        Ok(BodyData::CryptoCreateAccount(AccountCreateData {
            key: self.key,
            initial_balance: self.initial_balance,
            memo: self.account_memo.clone(),
            hook_creation_details: self.hooks.clone(),
        }))
    }

    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        match single_chunk::<Self>(chunks)? {
            BodyData::CryptoCreateAccount(data) => Ok(Self {
                key: data.key,
                initial_balance: data.initial_balance,
                account_memo: data.memo,
                hooks: data.hook_creation_details,
            }),
            other => Err(unexpected_body::<Self>(&other)),
        }
    }
}
