//! Hash helpers.
//!
//! SHA-384 is what the network uses for transaction hashes and node
//! certificate hashes, so that's the only digest the SDK exposes.

use sha2::{Digest, Sha384};

/// Length of a SHA-384 digest in bytes.
pub const SHA384_LENGTH: usize = 48;

/// Computes SHA-384 over `data`.
pub fn sha384(data: &[u8]) -> [u8; SHA384_LENGTH] {
    let digest = Sha384::digest(data);
    let mut out = [0u8; SHA384_LENGTH];
    out.copy_from_slice(&digest);
    out
}
