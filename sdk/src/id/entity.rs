//! Shard/realm/number entity identifiers and ledger-specific checksums.
//!
//! Every account, contract, file, and token on the network is addressed as
//! `shard.realm.num`. Humans copying those around make typos, so ids may carry
//! a five-letter checksum (`0.0.123-vfmkw`) derived from the address and the
//! ledger it belongs to. A checksum for the wrong ledger fails validation,
//! which is the whole point: testnet ids pasted into a mainnet app get caught.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// LedgerId
// ---------------------------------------------------------------------------

/// Identifies which ledger an id lives on. Feeds the checksum derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerId {
    Mainnet,
    Testnet,
    Previewnet,
    /// A private or local ledger, identified by raw bytes.
    Other(Vec<u8>),
}

impl LedgerId {
    /// Parses a network name or a hex-encoded ledger id.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            config::MAINNET_NAME => Ok(Self::Mainnet),
            config::TESTNET_NAME => Ok(Self::Testnet),
            config::PREVIEWNET_NAME => Ok(Self::Previewnet),
            other => hex::decode(other)
                .map(Self::from_bytes)
                .map_err(|_| Error::argument(format!("unknown ledger id `{name}`"))),
        }
    }

    /// Maps raw bytes back to a well-known ledger where possible.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match bytes.as_slice() {
            [config::MAINNET_LEDGER_ID] => Self::Mainnet,
            [config::TESTNET_LEDGER_ID] => Self::Testnet,
            [config::PREVIEWNET_LEDGER_ID] => Self::Previewnet,
            _ => Self::Other(bytes),
        }
    }

    /// The raw ledger id bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Mainnet => vec![config::MAINNET_LEDGER_ID],
            Self::Testnet => vec![config::TESTNET_LEDGER_ID],
            Self::Previewnet => vec![config::PREVIEWNET_LEDGER_ID],
            Self::Other(bytes) => bytes.clone(),
        }
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", config::network_label(&self.to_bytes()))
    }
}

// ---------------------------------------------------------------------------
// Checksum
// ---------------------------------------------------------------------------

/// Derives the five-letter checksum for `address` (`"s.r.n"`) on `ledger`.
///
/// Digits count as themselves and `.` counts as 10. Two mod-11 parity sums, a
/// weighted base-26 sum of the address, and a hash of the ledger id (padded
/// with six zero bytes) are combined, multiplied by 1_000_003 mod 26^5, and
/// written as five lowercase letters.
pub fn checksum(ledger: &LedgerId, address: &str) -> String {
    const P3: u64 = 26 * 26 * 26;
    const P5: u64 = 26 * 26 * 26 * 26 * 26;
    const M: u64 = 1_000_003;
    const W: u64 = 31;

    let digits: Vec<u64> = address
        .chars()
        .map(|c| c.to_digit(10).map(u64::from).unwrap_or(10))
        .collect();

    let mut s0 = 0u64;
    let mut s1 = 0u64;
    let mut s = 0u64;
    for (i, d) in digits.iter().enumerate() {
        s = (W * s + d) % P3;
        if i % 2 == 0 {
            s0 = (s0 + d) % 11;
        } else {
            s1 = (s1 + d) % 11;
        }
    }

    let mut sh = 0u64;
    let mut ledger_bytes = ledger.to_bytes();
    ledger_bytes.extend_from_slice(&[0u8; 6]);
    for b in ledger_bytes {
        sh = (W * sh + u64::from(b)) % P5;
    }

    let len = address.len() as u64;
    let mut c = ((((len % 5) * 11 + s0) * 11 + s1) * P3 + s + sh) % P5;
    c = (c * M) % P5;

    let mut letters = [b'a'; 5];
    for slot in letters.iter_mut().rev() {
        *slot = b'a' + (c % 26) as u8;
        c /= 26;
    }
    letters.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// ValidateChecksums
// ---------------------------------------------------------------------------

/// Implemented by everything that embeds entity ids. Walks each id and checks
/// its checksum (if it has one) against `ledger`. Absent ids are skipped.
pub trait ValidateChecksums {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()>;
}

impl<T: ValidateChecksums> ValidateChecksums for Option<T> {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        match self {
            Some(inner) => inner.validate_checksums(ledger),
            None => Ok(()),
        }
    }
}

impl<T: ValidateChecksums> ValidateChecksums for [T] {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.iter().try_for_each(|item| item.validate_checksums(ledger))
    }
}

impl<T: ValidateChecksums> ValidateChecksums for Vec<T> {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.as_slice().validate_checksums(ledger)
    }
}

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A `shard.realm.num` identifier with an optional checksum.
///
/// Equality, ordering, and hashing ignore the checksum: `0.0.5` and
/// `0.0.5-abcde` name the same entity. The checksum never goes on the wire.
#[derive(Clone, Serialize, Deserialize)]
pub struct EntityId {
    pub shard: u64,
    pub realm: u64,
    pub num: u64,
    #[serde(skip)]
    checksum: Option<String>,
}

/// Accounts.
pub type AccountId = EntityId;
/// Smart contracts.
pub type ContractId = EntityId;
/// Files.
pub type FileId = EntityId;
/// Fungible and non-fungible tokens.
pub type TokenId = EntityId;

impl EntityId {
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self {
            shard,
            realm,
            num,
            checksum: None,
        }
    }

    /// Shorthand for `0.0.num`, which is what nearly every id looks like.
    pub const fn from_num(num: u64) -> Self {
        Self::new(0, 0, num)
    }

    /// Attaches a checksum. Validation happens later, against a ledger.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    /// `s.r.n-xxxxx` with the checksum derived for `ledger`.
    pub fn to_string_with_checksum(&self, ledger: &LedgerId) -> String {
        format!("{}-{}", self, checksum(ledger, &self.to_string()))
    }

    /// Fails with [`Error::BadEntityId`] if this id carries a checksum that
    /// doesn't belong to `ledger`.
    pub fn validate_checksum(&self, ledger: &LedgerId) -> Result<()> {
        let Some(present) = &self.checksum else {
            return Ok(());
        };
        let expected = checksum(ledger, &self.to_string());
        if *present != expected {
            return Err(Error::BadEntityId {
                shard: self.shard,
                realm: self.realm,
                num: self.num,
                present_checksum: present.clone(),
                expected_checksum: expected,
            });
        }
        Ok(())
    }
}

impl ValidateChecksums for EntityId {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.validate_checksum(ledger)
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        (self.shard, self.realm, self.num) == (other.shard, other.realm, other.num)
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.shard, self.realm, self.num).hash(state);
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.shard, self.realm, self.num).cmp(&(other.shard, other.realm, other.num))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({self})")
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::argument(format!(
                "invalid entity id `{s}`: expected s.r.n or s.r.n-checksum"
            ))
        };

        let (address, checksum) = match s.split_once('-') {
            Some((address, checksum)) => (address, Some(checksum)),
            None => (s, None),
        };

        let mut parts = address.split('.');
        let mut next = || -> Result<u64> {
            parts
                .next()
                .and_then(|p| p.parse::<u64>().ok())
                .ok_or_else(invalid)
        };
        let shard = next()?;
        let realm = next()?;
        let num = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let id = Self::new(shard, realm, num);
        match checksum {
            Some(c) if c.len() == 5 && c.bytes().all(|b| b.is_ascii_lowercase()) => {
                Ok(id.with_checksum(c))
            }
            Some(_) => Err(invalid()),
            None => Ok(id),
        }
    }
}

// ---------------------------------------------------------------------------
// NftId
// ---------------------------------------------------------------------------

/// A single non-fungible token: the token class plus a serial number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NftId {
    pub token_id: TokenId,
    pub serial: u64,
}

impl NftId {
    pub fn new(token_id: TokenId, serial: u64) -> Self {
        Self { token_id, serial }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token_id, self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_matches_published_vector() {
        // The canonical example from the address format docs.
        assert_eq!(checksum(&LedgerId::Mainnet, "0.0.123"), "vfmkw");
    }

    #[test]
    fn test_checksum_differs_per_ledger() {
        assert_eq!(checksum(&LedgerId::Testnet, "0.0.123"), "esxsf");
        assert_eq!(checksum(&LedgerId::Previewnet, "0.0.123"), "ogizo");
    }

    #[test]
    fn test_parse_plain_and_checksummed() {
        let plain: EntityId = "0.0.123".parse().unwrap();
        assert_eq!(plain, EntityId::from_num(123));
        assert_eq!(plain.checksum(), None);

        let with: EntityId = "1.2.3-islfi".parse().unwrap();
        assert_eq!(with, EntityId::new(1, 2, 3));
        assert_eq!(with.checksum(), Some("islfi"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "0.0", "0.0.1.2", "a.b.c", "0.0.1-ABCDE", "0.0.1-abc"] {
            assert!(bad.parse::<EntityId>().is_err(), "`{bad}` should not parse");
        }
    }

    #[test]
    fn test_validate_checksum() {
        let good: EntityId = "0.0.123-vfmkw".parse().unwrap();
        assert!(good.validate_checksum(&LedgerId::Mainnet).is_ok());

        // Right format, wrong ledger.
        let err = good.validate_checksum(&LedgerId::Testnet).unwrap_err();
        match err {
            Error::BadEntityId {
                num,
                present_checksum,
                expected_checksum,
                ..
            } => {
                assert_eq!(num, 123);
                assert_eq!(present_checksum, "vfmkw");
                assert_eq!(expected_checksum, "esxsf");
            }
            other => panic!("expected BadEntityId, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_checksum_always_validates() {
        assert!(EntityId::from_num(5)
            .validate_checksum(&LedgerId::Testnet)
            .is_ok());
    }

    #[test]
    fn test_equality_ignores_checksum() {
        let a = EntityId::from_num(123);
        let b = EntityId::from_num(123).with_checksum("vfmkw");
        assert_eq!(a, b);
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }

    #[test]
    fn test_to_string_with_checksum() {
        assert_eq!(
            EntityId::from_num(123).to_string_with_checksum(&LedgerId::Mainnet),
            "0.0.123-vfmkw"
        );
    }

    #[test]
    fn test_ledger_id_from_name() {
        assert_eq!(LedgerId::from_name("TESTNET").unwrap(), LedgerId::Testnet);
        assert_eq!(LedgerId::from_name("01").unwrap(), LedgerId::Testnet);
        assert_eq!(
            LedgerId::from_name("cafe").unwrap(),
            LedgerId::Other(vec![0xca, 0xfe])
        );
        assert!(LedgerId::from_name("not-a-ledger").is_err());
    }

    #[test]
    fn test_option_and_vec_validation_walks_every_id() {
        let ids = vec![
            EntityId::from_num(1),
            "0.0.123-vfmkw".parse::<EntityId>().unwrap(),
        ];
        assert!(ids.validate_checksums(&LedgerId::Mainnet).is_ok());
        assert!(ids.validate_checksums(&LedgerId::Testnet).is_err());

        let absent: Option<EntityId> = None;
        assert!(absent.validate_checksums(&LedgerId::Testnet).is_ok());
    }
}
