//! # Cryptographic Primitives
//!
//! Everything the SDK needs from cryptography: Ed25519 keys for signing
//! transaction bodies and SHA-384 for transaction hashes.
//!
//! Both are thin, typed wrappers around audited crates (`ed25519-dalek`,
//! `sha2`). Nothing here is clever, and it should stay that way.

pub mod hash;
pub mod keys;

pub use hash::sha384;
pub use keys::{KeyError, PrivateKey, PublicKey, TransactionSigner};
