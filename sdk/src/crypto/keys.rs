//! # Key Management
//!
//! Ed25519 keys for signing transactions.
//!
//! Key generation and signing are thin wrappers over `ed25519-dalek`. The SDK
//! only needs three things from a key: its public half (to label signatures),
//! a way to sign body bytes, and a stable ordering so signature maps come out
//! the same every time.
//!
//! Key bytes are never logged. Debug output shows the public half only.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// Deliberately vague about *why* key material was rejected.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid private key bytes: expected 32 bytes of hex")]
    InvalidPrivateKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// TransactionSigner
// ---------------------------------------------------------------------------

/// Anything that can produce signatures over transaction body bytes.
///
/// [`PrivateKey`] implements this directly. Hardware wallets and remote
/// signers implement it by forwarding `sign_message` wherever the key lives.
pub trait TransactionSigner: Send + Sync {
    /// The public key signatures will be recorded under.
    fn public_key(&self) -> PublicKey;

    /// Signs `message` and returns the raw signature bytes.
    fn sign_message(&self, message: &[u8]) -> Vec<u8>;
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// An Ed25519 private key.
///
/// Does not implement `Serialize`. Exporting key material should be a
/// deliberate call to [`to_hex`](Self::to_hex), not a side effect of putting
/// a key into a config struct.
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generates a fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Builds a key deterministically from a 32-byte seed. Handy for tests;
    /// a weak seed gives you a weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parses a hex-encoded 32-byte private key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Exports the key as hex. Handle with care.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The public half of this key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Signs a message. Ed25519 is deterministic, so the same key and message
    /// always give the same 64 bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(pub={})", self.public_key())
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TransactionSigner for PrivateKey {
    fn public_key(&self) -> PublicKey {
        PrivateKey::public_key(self)
    }

    fn sign_message(&self, message: &[u8]) -> Vec<u8> {
        self.sign(message)
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// An Ed25519 public key.
///
/// Ordered by raw bytes so signature maps keyed by public key iterate in the
/// same order on every machine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; 32],
}

impl PublicKey {
    /// Parses raw public key bytes, rejecting anything that isn't a valid
    /// curve point.
    pub fn from_bytes(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parses a hex-encoded public key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Checks a signature made by the matching private key.
    ///
    /// Returns a plain boolean; callers only ever want yes or no.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
