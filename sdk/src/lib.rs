// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger SDK: Client Core
//!
//! The client side of a distributed ledger: build a transaction, freeze it
//! against a set of nodes, sign it for each of them, encode it, and get it
//! accepted by the network. Long payloads are split into chunks, flaky nodes
//! are benched for a while, and transient failures are retried on a bounded
//! exponential schedule.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants and SDK defaults.
//! - **error**: One error enum and the retryable/fatal split.
//! - **crypto**: Ed25519 keys and the SHA-384 transaction hash.
//! - **id**: Entity ids, checksums, transaction ids, hook identities.
//! - **network**: Node health, the node pool, the worker pool.
//! - **codec**: Length-framed bincode envelopes and transaction bodies.
//! - **transaction**: The generic lifecycle and every concrete kind.
//! - **execution**: Retry loop, node submission, transports.
//! - **fees**: Fee estimates from the mirror REST service.
//! - **client**: Wires all of the above together.
//!
//! ## Quick Start
//!
//! ```ignore
//! let client = Client::from_config_file("client.json")?;
//! let mut tx = TransferTransaction::new();
//! tx.add_hbar_transfer(AccountId::from_num(2), -10)?
//!     .add_hbar_transfer(AccountId::from_num(3), 10)?;
//! let response = tx.execute(&client).await?;
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod client;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod execution;
pub mod fees;
pub mod id;
pub mod network;
pub mod transaction;

pub use client::{Client, ClientBuilder, ClientConfig, Operator};
pub use crypto::{PrivateKey, PublicKey, TransactionSigner};
pub use error::{Error, Result};
pub use execution::{RetryPolicy, TransactionResponse};
pub use fees::{FeeEstimateMode, FeeEstimateQuery, FeeEstimateResponse};
pub use id::{AccountId, EntityId, FileId, LedgerId, TokenId, TransactionId};
pub use transaction::{AnyTransaction, Transaction, TransactionState};
