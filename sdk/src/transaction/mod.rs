//! # Transaction Module
//!
//! Construction, freezing, chunking, signing, and (de)serialization of every
//! supported transaction kind.
//!
//! ## Architecture
//!
//! ```text
//! lifecycle.rs      - Transaction<D>: the Draft -> Frozen -> Signed state machine
//! signatures.rs     - Flat (node, chunk, key) signature store + nested projection
//! chunk.rs          - Chunk count and byte-range arithmetic
//! endpoint.rs       - Node endpoints and their validators
//! transfer.rs       - HBAR/token/NFT transfers with typed hook slots
//! file_append.rs    - Chunked file appends
//! account_create.rs - Account creation with hooks
//! node_create.rs    - Address book additions (gossip endpoint rewrite)
//! node_update.rs    - Address book edits
//! node_delete.rs    - Address book removals
//! hook_store.rs     - Hook storage writes (never schedulable)
//! any.rs            - AnyTransaction: decode bytes of unknown kind
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Draft**: setters validate and store fields.
//! 2. **Freeze**: node ids and transaction id are bound, chunk ids derived.
//!    Field setters fail from here on.
//! 3. **Sign**: signatures are recorded per (node, chunk). Any signature
//!    moves the state to `Signed`.
//! 4. **Execute**: see [`crate::execution`].
//!
//! ## Design Decisions
//!
//! - One generic type with one guard rather than a draft type and a frozen
//!   type. Decoded bytes can land in any state, and a single type keeps
//!   `from_bytes` returning one thing.
//! - Chunk `i` is identified by the base transaction id plus `i` nanoseconds,
//!   so ids are re-derivable and ordered.
//! - Signatures never leave the flat store; the nested map users see is built
//!   on demand.

pub mod account_create;
pub mod any;
pub mod chunk;
pub mod endpoint;
pub mod file_append;
pub mod hook_store;
pub mod lifecycle;
pub mod node_create;
pub mod node_delete;
pub mod node_update;
pub mod signatures;
pub mod transfer;

pub use account_create::{AccountCreate, AccountCreateTransaction};
pub use any::AnyTransaction;
pub use chunk::{chunk_count, ChunkPlan, ChunkRange};
pub use endpoint::Endpoint;
pub use file_append::{FileAppend, FileAppendTransaction};
pub use hook_store::{HookStore, HookStoreTransaction};
pub use lifecycle::{SignableNodeBody, Transaction, TransactionData, TransactionState};
pub use node_create::{NodeCreate, NodeCreateTransaction};
pub use node_delete::{NodeDelete, NodeDeleteTransaction};
pub use node_update::{NodeUpdate, NodeUpdateTransaction};
pub use signatures::SignatureStore;
pub use transfer::{
    AccountAmount, NftTransfer, TokenTransferList, Transfer, TransferTransaction,
};
