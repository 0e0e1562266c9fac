//! Hbar, token, and NFT transfers, with optional allowance hooks.
//!
//! A transfer entry may carry one hook call. Which wire slot the call lands
//! in is decided by its declared type, never by the order entries were
//! added, and decoding reads the type back from whichever slot was filled:
//!
//! | Hook type                | Wire slot                             |
//! |--------------------------|---------------------------------------|
//! | `PreTxAllowanceHook`     | `pre_tx_allowance_hook`               |
//! | `PrePostTxAllowanceHook` | `pre_post_tx_allowance_hook`          |
//! | `PreHookSender`          | `pre_tx_sender_allowance_hook`        |
//! | `PrePostHookSender`      | `pre_post_tx_sender_allowance_hook`   |
//! | `PreHookReceiver`        | `pre_tx_receiver_allowance_hook`      |
//! | `PrePostHookReceiver`    | `pre_post_tx_receiver_allowance_hook` |

use super::chunk::ChunkRange;
use super::lifecycle::{single_chunk, unexpected_body, Transaction, TransactionData};
use crate::codec::{
    AccountAmountData, BodyData, NftTransferData, TokenTransferListData, TransferData,
    WireHookCall,
};
use crate::error::{Error, Result};
use crate::id::{
    AccountId, FungibleHookCall, FungibleHookType, LedgerId, NftHookCall, NftHookType, NftId,
    TokenId, ValidateChecksums,
};

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// Net movement for one account. Positive receives, negative sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAmount {
    pub account_id: AccountId,
    pub amount: i64,
    pub is_approved: bool,
    pub hook_call: Option<FungibleHookCall>,
}

/// One NFT moving from `sender` to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftTransfer {
    pub serial: u64,
    pub sender: AccountId,
    pub receiver: AccountId,
    pub is_approved: bool,
    pub sender_hook_call: Option<NftHookCall>,
    pub receiver_hook_call: Option<NftHookCall>,
}

/// Everything moving for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransferList {
    pub token_id: TokenId,
    pub expected_decimals: Option<u32>,
    pub transfers: Vec<AccountAmount>,
    pub nft_transfers: Vec<NftTransfer>,
}

/// Fields of a [`TransferTransaction`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    pub hbar_transfers: Vec<AccountAmount>,
    pub token_transfers: Vec<TokenTransferList>,
}

pub type TransferTransaction = Transaction<Transfer>;

/// Adds `amount` to the entry for `account_id`, creating it if needed.
/// Amounts sum, approval ORs, and a new hook call replaces the old one.
/// A sum outside `i64` fails and leaves the entry untouched.
fn merge_amount(
    entries: &mut Vec<AccountAmount>,
    account_id: AccountId,
    amount: i64,
    is_approved: bool,
    hook_call: Option<FungibleHookCall>,
) -> Result<()> {
    if let Some(existing) = entries.iter_mut().find(|e| e.account_id == account_id) {
        existing.amount = existing.amount.checked_add(amount).ok_or_else(|| {
            Error::argument(format!(
                "transfer amount for {account_id} overflows: {} + {amount}",
                existing.amount
            ))
        })?;
        existing.is_approved |= is_approved;
        if hook_call.is_some() {
            existing.hook_call = hook_call;
        }
        return Ok(());
    }
    entries.push(AccountAmount {
        account_id,
        amount,
        is_approved,
        hook_call,
    });
    Ok(())
}

impl Transfer {
    fn token_list(&mut self, token_id: TokenId) -> &mut TokenTransferList {
        let index = match self.token_transfers.iter().position(|t| t.token_id == token_id) {
            Some(index) => index,
            None => {
                self.token_transfers.push(TokenTransferList {
                    token_id,
                    expected_decimals: None,
                    transfers: Vec::new(),
                    nft_transfers: Vec::new(),
                });
                self.token_transfers.len() - 1
            }
        };
        &mut self.token_transfers[index]
    }
}

// ---------------------------------------------------------------------------
// Setters
// ---------------------------------------------------------------------------

impl Transaction<Transfer> {
    pub fn add_hbar_transfer(&mut self, account_id: AccountId, amount: i64) -> Result<&mut Self> {
        let data = self.data_mut()?;
        merge_amount(&mut data.hbar_transfers, account_id, amount, false, None)?;
        Ok(self)
    }

    pub fn add_approved_hbar_transfer(
        &mut self,
        account_id: AccountId,
        amount: i64,
    ) -> Result<&mut Self> {
        let data = self.data_mut()?;
        merge_amount(&mut data.hbar_transfers, account_id, amount, true, None)?;
        Ok(self)
    }

    pub fn add_hbar_transfer_with_hook(
        &mut self,
        account_id: AccountId,
        amount: i64,
        hook_call: FungibleHookCall,
    ) -> Result<&mut Self> {
        let data = self.data_mut()?;
        merge_amount(&mut data.hbar_transfers, account_id, amount, false, Some(hook_call))?;
        Ok(self)
    }

    pub fn add_token_transfer(
        &mut self,
        token_id: TokenId,
        account_id: AccountId,
        amount: i64,
    ) -> Result<&mut Self> {
        let list = self.data_mut()?.token_list(token_id);
        merge_amount(&mut list.transfers, account_id, amount, false, None)?;
        Ok(self)
    }

    /// Like [`add_token_transfer`](Self::add_token_transfer), also pinning the
    /// token's decimals. Conflicting decimals for the same token fail.
    pub fn add_token_transfer_with_decimals(
        &mut self,
        token_id: TokenId,
        account_id: AccountId,
        amount: i64,
        decimals: u32,
    ) -> Result<&mut Self> {
        let list = self.data_mut()?.token_list(token_id);
        match list.expected_decimals {
            Some(existing) if existing != decimals => {
                return Err(Error::argument(format!(
                    "expected decimals for token {} already set to {existing}, cannot change to {decimals}",
                    list.token_id
                )));
            }
            _ => list.expected_decimals = Some(decimals),
        }
        merge_amount(&mut list.transfers, account_id, amount, false, None)?;
        Ok(self)
    }

    pub fn add_token_transfer_with_hook(
        &mut self,
        token_id: TokenId,
        account_id: AccountId,
        amount: i64,
        hook_call: FungibleHookCall,
    ) -> Result<&mut Self> {
        let list = self.data_mut()?.token_list(token_id);
        merge_amount(&mut list.transfers, account_id, amount, false, Some(hook_call))?;
        Ok(self)
    }

    pub fn add_nft_transfer(
        &mut self,
        nft_id: NftId,
        sender: AccountId,
        receiver: AccountId,
    ) -> Result<&mut Self> {
        self.add_nft_transfer_with_hooks(nft_id, sender, receiver, None, None)
    }

    /// Adds an NFT transfer with optional sender and receiver hook calls.
    /// Each call's type must match the side it is attached to.
    pub fn add_nft_transfer_with_hooks(
        &mut self,
        nft_id: NftId,
        sender: AccountId,
        receiver: AccountId,
        sender_hook_call: Option<NftHookCall>,
        receiver_hook_call: Option<NftHookCall>,
    ) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if let Some(call) = &sender_hook_call {
            if !call.hook_type.is_sender() {
                return Err(Error::argument(format!(
                    "{:?} cannot be used as a sender hook",
                    call.hook_type
                )));
            }
        }
        if let Some(call) = &receiver_hook_call {
            if !call.hook_type.is_receiver() {
                return Err(Error::argument(format!(
                    "{:?} cannot be used as a receiver hook",
                    call.hook_type
                )));
            }
        }

        let list = self.data_mut()?.token_list(nft_id.token_id);
        list.nft_transfers.push(NftTransfer {
            serial: nft_id.serial,
            sender,
            receiver,
            is_approved: false,
            sender_hook_call,
            receiver_hook_call,
        });
        Ok(self)
    }

    pub fn hbar_transfers(&self) -> &[AccountAmount] {
        &self.data().hbar_transfers
    }

    pub fn token_transfers(&self) -> &[TokenTransferList] {
        &self.data().token_transfers
    }
}

// ---------------------------------------------------------------------------
// Hook Slots
// ---------------------------------------------------------------------------

fn wire_call(hook_id: u64, call: &crate::id::EvmHookCall) -> WireHookCall {
    WireHookCall {
        hook_id,
        evm_hook_call: call.clone(),
    }
}

fn amount_to_wire(entry: &AccountAmount) -> AccountAmountData {
    let mut wire = AccountAmountData {
        account_id: entry.account_id.clone(),
        amount: entry.amount,
        is_approval: entry.is_approved,
        pre_tx_allowance_hook: None,
        pre_post_tx_allowance_hook: None,
    };
    if let Some(call) = &entry.hook_call {
        let slot = wire_call(call.hook_id, &call.evm_hook_call);
        match call.hook_type {
            FungibleHookType::PreTxAllowanceHook => wire.pre_tx_allowance_hook = Some(slot),
            FungibleHookType::PrePostTxAllowanceHook => {
                wire.pre_post_tx_allowance_hook = Some(slot)
            }
        }
    }
    wire
}

fn amount_from_wire(wire: AccountAmountData) -> Result<AccountAmount> {
    let hook_call = match (wire.pre_tx_allowance_hook, wire.pre_post_tx_allowance_hook) {
        (Some(_), Some(_)) => {
            return Err(Error::decoding(format!(
                "transfer for {} populates both allowance hook slots",
                wire.account_id
            )))
        }
        (Some(call), None) => Some(FungibleHookCall::new(
            call.hook_id,
            call.evm_hook_call,
            FungibleHookType::PreTxAllowanceHook,
        )),
        (None, Some(call)) => Some(FungibleHookCall::new(
            call.hook_id,
            call.evm_hook_call,
            FungibleHookType::PrePostTxAllowanceHook,
        )),
        (None, None) => None,
    };
    Ok(AccountAmount {
        account_id: wire.account_id,
        amount: wire.amount,
        is_approved: wire.is_approval,
        hook_call,
    })
}

fn nft_to_wire(entry: &NftTransfer) -> NftTransferData {
    let mut wire = NftTransferData {
        sender_account_id: entry.sender.clone(),
        receiver_account_id: entry.receiver.clone(),
        serial_number: entry.serial,
        is_approval: entry.is_approved,
        pre_tx_sender_allowance_hook: None,
        pre_post_tx_sender_allowance_hook: None,
        pre_tx_receiver_allowance_hook: None,
        pre_post_tx_receiver_allowance_hook: None,
    };
    for call in [&entry.sender_hook_call, &entry.receiver_hook_call]
        .into_iter()
        .flatten()
    {
        let slot = Some(wire_call(call.hook_id, &call.evm_hook_call));
        match call.hook_type {
            NftHookType::PreHookSender => wire.pre_tx_sender_allowance_hook = slot,
            NftHookType::PrePostHookSender => wire.pre_post_tx_sender_allowance_hook = slot,
            NftHookType::PreHookReceiver => wire.pre_tx_receiver_allowance_hook = slot,
            NftHookType::PrePostHookReceiver => wire.pre_post_tx_receiver_allowance_hook = slot,
        }
    }
    wire
}

fn nft_call_from_slots(
    side: &str,
    serial: u64,
    pre: Option<WireHookCall>,
    pre_post: Option<WireHookCall>,
    pre_type: NftHookType,
    pre_post_type: NftHookType,
) -> Result<Option<NftHookCall>> {
    match (pre, pre_post) {
        (Some(_), Some(_)) => Err(Error::decoding(format!(
            "NFT serial {serial} populates both {side} hook slots"
        ))),
        (Some(call), None) => Ok(Some(NftHookCall::new(call.hook_id, call.evm_hook_call, pre_type))),
        (None, Some(call)) => Ok(Some(NftHookCall::new(
            call.hook_id,
            call.evm_hook_call,
            pre_post_type,
        ))),
        (None, None) => Ok(None),
    }
}

fn nft_from_wire(wire: NftTransferData) -> Result<NftTransfer> {
    let serial = wire.serial_number;
    Ok(NftTransfer {
        serial,
        sender_hook_call: nft_call_from_slots(
            "sender",
            serial,
            wire.pre_tx_sender_allowance_hook,
            wire.pre_post_tx_sender_allowance_hook,
            NftHookType::PreHookSender,
            NftHookType::PrePostHookSender,
        )?,
        receiver_hook_call: nft_call_from_slots(
            "receiver",
            serial,
            wire.pre_tx_receiver_allowance_hook,
            wire.pre_post_tx_receiver_allowance_hook,
            NftHookType::PreHookReceiver,
            NftHookType::PrePostHookReceiver,
        )?,
        sender: wire.sender_account_id,
        receiver: wire.receiver_account_id,
        is_approved: wire.is_approval,
    })
}

// ---------------------------------------------------------------------------
// TransactionData
// ---------------------------------------------------------------------------

impl ValidateChecksums for Transfer {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        for entry in &self.hbar_transfers {
            entry.account_id.validate_checksum(ledger)?;
        }
        for list in &self.token_transfers {
            list.token_id.validate_checksum(ledger)?;
            for entry in &list.transfers {
                entry.account_id.validate_checksum(ledger)?;
            }
            for nft in &list.nft_transfers {
                nft.sender.validate_checksum(ledger)?;
                nft.receiver.validate_checksum(ledger)?;
            }
        }
        Ok(())
    }
}

impl TransactionData for Transfer {
    const NAME: &'static str = "TransferTransaction";

    fn body_data(&self, _chunk: &ChunkRange) -> Result<BodyData> {
        Ok(BodyData::CryptoTransfer(TransferData {
            hbar_transfers: self.hbar_transfers.iter().map(amount_to_wire).collect(),
            token_transfers: self
                .token_transfers
                .iter()
                .map(|list| TokenTransferListData {
                    token_id: list.token_id.clone(),
                    expected_decimals: list.expected_decimals,
                    transfers: list.transfers.iter().map(amount_to_wire).collect(),
                    nft_transfers: list.nft_transfers.iter().map(nft_to_wire).collect(),
                })
                .collect(),
        }))
    }

    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        let data = match single_chunk::<Self>(chunks)? {
            BodyData::CryptoTransfer(data) => data,
            other => return Err(unexpected_body::<Self>(&other)),
        };
        Ok(Self {
            hbar_transfers: data
                .hbar_transfers
                .into_iter()
                .map(amount_from_wire)
                .collect::<Result<_>>()?,
            token_transfers: data
                .token_transfers
                .into_iter()
                .map(|list| {
                    Ok(TokenTransferList {
                        token_id: list.token_id,
                        expected_decimals: list.expected_decimals,
                        transfers: list
                            .transfers
                            .into_iter()
                            .map(amount_from_wire)
                            .collect::<Result<_>>()?,
                        nft_transfers: list
                            .nft_transfers
                            .into_iter()
                            .map(nft_from_wire)
                            .collect::<Result<_>>()?,
                    })
                })
                .collect::<Result<_>>()?,
        })
    }
}
