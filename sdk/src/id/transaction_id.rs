//! Timestamps and transaction identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::entity::{AccountId, LedgerId, ValidateChecksums};
use crate::error::{Error, Result};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// Seconds plus nanoseconds since the Unix epoch. `nanos` is always below one
/// second; constructors normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Self {
            seconds,
            nanos: 0,
        }
        .plus_nanos(u64::from(nanos))
    }

    /// The current UTC time.
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            seconds: now.timestamp(),
            nanos: now.timestamp_subsec_nanos() % NANOS_PER_SECOND as u32,
        }
    }

    /// Adds `nanos` nanoseconds, carrying into seconds.
    pub fn plus_nanos(self, nanos: u64) -> Self {
        let total = u64::from(self.nanos) + nanos;
        Self {
            seconds: self.seconds + (total / NANOS_PER_SECOND) as i64,
            nanos: (total % NANOS_PER_SECOND) as u32,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

// ---------------------------------------------------------------------------
// TransactionId
// ---------------------------------------------------------------------------

/// Identity of a transaction: who pays, and when it becomes valid.
///
/// Unique per `(payer, valid_start, nonce)`. Chunked transactions derive one
/// id per chunk by bumping `valid_start` a nanosecond at a time.
///
/// Text form: `0.0.5@1700000000.000000042`, optionally followed by
/// `?scheduled` and `/nonce`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start: Timestamp,
    pub nonce: Option<u32>,
    pub scheduled: bool,
}

impl TransactionId {
    pub fn new(account_id: AccountId, valid_start: Timestamp) -> Self {
        Self {
            account_id,
            valid_start,
            nonce: None,
            scheduled: false,
        }
    }

    /// A fresh id for `account_id`, valid from now.
    pub fn generate(account_id: AccountId) -> Self {
        Self::new(account_id, Timestamp::now())
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_scheduled(mut self, scheduled: bool) -> Self {
        self.scheduled = scheduled;
        self
    }

    /// The id of chunk `index` of a transaction whose first chunk is `self`.
    /// Chunk 0 is `self`.
    pub fn for_chunk(&self, index: usize) -> Self {
        Self {
            valid_start: self.valid_start.plus_nanos(index as u64),
            ..self.clone()
        }
    }
}

impl ValidateChecksums for TransactionId {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.account_id.validate_checksum(ledger)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.account_id, self.valid_start)?;
        if self.scheduled {
            write!(f, "?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        Ok(())
    }
}

impl FromStr for TransactionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::argument(format!("invalid transaction id `{s}`"));

        let (account, rest) = s.split_once('@').ok_or_else(invalid)?;
        let account_id: AccountId = account.parse()?;

        let (rest, nonce) = match rest.split_once('/') {
            Some((rest, nonce)) => (rest, Some(nonce.parse::<u32>().map_err(|_| invalid())?)),
            None => (rest, None),
        };
        let (rest, scheduled) = match rest.strip_suffix("?scheduled") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };

        let (seconds, nanos) = rest.split_once('.').ok_or_else(invalid)?;
        if nanos.len() != 9 {
            return Err(invalid());
        }
        let seconds = seconds.parse::<i64>().map_err(|_| invalid())?;
        let nanos = nanos.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self {
            account_id,
            valid_start: Timestamp::new(seconds, nanos),
            nonce,
            scheduled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransactionId {
        TransactionId::new(AccountId::from_num(5), Timestamp::new(1_700_000_000, 42))
    }

    #[test]
    fn test_display_format() {
        assert_eq!(sample().to_string(), "0.0.5@1700000000.000000042");
        assert_eq!(
            sample().with_scheduled(true).with_nonce(3).to_string(),
            "0.0.5@1700000000.000000042?scheduled/3"
        );
    }

    #[test]
    fn test_parse_accepts_display_output() {
        let id = sample().with_scheduled(true).with_nonce(7);
        let parsed: TransactionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["0.0.5", "0.0.5@17", "0.0.5@1.2", "x@1.000000000", "0.0.5@1.000000000/x"] {
            assert!(bad.parse::<TransactionId>().is_err(), "`{bad}` should not parse");
        }
    }

    #[test]
    fn test_plus_nanos_carries_into_seconds() {
        let ts = Timestamp::new(10, 999_999_999).plus_nanos(2);
        assert_eq!(ts, Timestamp::new(11, 1));
    }

    #[test]
    fn test_new_normalizes_overflowing_nanos() {
        assert_eq!(Timestamp::new(1, 1_500_000_000), Timestamp::new(2, 500_000_000));
    }

    #[test]
    fn test_chunk_ids_are_ordered_and_distinct() {
        let base = sample();
        assert_eq!(base.for_chunk(0), base);
        let ids: Vec<_> = (0..4).map(|i| base.for_chunk(i)).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[3].valid_start, Timestamp::new(1_700_000_000, 45));
    }

    #[test]
    fn test_generate_uses_current_time() {
        let before = Timestamp::now();
        let id = TransactionId::generate(AccountId::from_num(2));
        assert!(id.valid_start >= before);
        assert_eq!(id.nonce, None);
        assert!(!id.scheduled);
    }
}
