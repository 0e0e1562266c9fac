//! # SDK Configuration & Constants
//!
//! Every magic number the SDK relies on lives here. If you're hardcoding a
//! limit somewhere else, move it here and save the next reader a grep.
//!
//! Most of these values mirror what the network enforces server-side. Getting
//! them wrong on the client doesn't break the network, it just means users find
//! out about their mistake one round trip later.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Network Names
// ---------------------------------------------------------------------------

/// Mainnet. Real accounts, real fees.
pub const MAINNET_NAME: &str = "mainnet";

/// Testnet. Reset occasionally, funded by faucets.
pub const TESTNET_NAME: &str = "testnet";

/// Previewnet. Gets features before everyone else, and their bugs too.
pub const PREVIEWNET_NAME: &str = "previewnet";

/// Ledger id bytes for the well-known networks. These feed the checksum
/// derivation, so they are part of every checksummed address ever printed.
pub const MAINNET_LEDGER_ID: u8 = 0x00;
pub const TESTNET_LEDGER_ID: u8 = 0x01;
pub const PREVIEWNET_LEDGER_ID: u8 = 0x02;

// ---------------------------------------------------------------------------
// Retry & Backoff
// ---------------------------------------------------------------------------

/// Attempts per logical call before the last error is handed back.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// First retry delay. Doubles on every subsequent failure.
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_millis(250);

/// Ceiling for a single retry delay. Caps one wait, not the total.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Initial time a node spends in the penalty box after a failed attempt.
pub const DEFAULT_MIN_NODE_BACKOFF: Duration = Duration::from_secs(8);

/// Longest a node can be benched. An hour is long enough that a truly dead
/// node stops eating attempts, short enough that it can come back the same day.
pub const DEFAULT_MAX_NODE_BACKOFF: Duration = Duration::from_secs(60 * 60);

/// Wall-clock deadline for a whole logical call, retries included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Transaction Defaults & Limits
// ---------------------------------------------------------------------------

/// How long after `valid_start` the network will still accept a transaction.
pub const DEFAULT_TRANSACTION_VALID_DURATION: Duration = Duration::from_secs(120);

/// Default fee ceiling in tinybars (2 whole units).
pub const DEFAULT_MAX_TRANSACTION_FEE: u64 = 200_000_000;

/// Transaction memo limit, counted in UTF-8 bytes, not characters.
pub const MAX_MEMO_BYTES: usize = 100;

/// Default chunk size for payload-bearing transactions.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default cap on the number of chunks a single payload may be split into.
pub const DEFAULT_MAX_CHUNKS: usize = 20;

// ---------------------------------------------------------------------------
// Node Management Limits
// ---------------------------------------------------------------------------

/// Node description limit in UTF-8 bytes.
pub const MAX_NODE_DESCRIPTION_BYTES: usize = 100;

/// Gossip endpoints a node may advertise.
pub const MAX_GOSSIP_ENDPOINTS: usize = 10;

/// Service (client-facing) endpoints a node may advertise.
pub const MAX_SERVICE_ENDPOINTS: usize = 8;

/// gRPC certificate hashes are SHA-384. 48 bytes, no more, no less.
pub const GRPC_CERTIFICATE_HASH_LENGTH: usize = 48;

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// EVM storage words are 32 bytes. Keys and values longer than that can't
/// be stored, so we refuse them up front.
pub const MAX_STORAGE_SLOT_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Wire Format
// ---------------------------------------------------------------------------

/// Magic preamble on every framed message: "LSDK".
pub const WIRE_MAGIC: [u8; 4] = *b"LSDK";

/// Frame format version. Bump on incompatible envelope changes.
pub const WIRE_VERSION: u8 = 1;

/// Upper bound on a single decoded frame. Anything larger is either a bug or
/// an attack, and we don't want to allocate for either.
pub const MAX_WIRE_MESSAGE_SIZE: u64 = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Mirror REST
// ---------------------------------------------------------------------------

/// Path prefix of the mirror REST API.
pub const MIRROR_REST_PATH: &str = "/api/v1";

/// Relative path of the fee estimation endpoint.
pub const FEE_ESTIMATE_PATH: &str = "/network/fees";

/// Content type for fee estimate requests. The body is the encoded transaction.
pub const FEE_ESTIMATE_CONTENT_TYPE: &str = "application/protobuf";

/// Base delay for fee estimate retries, and the smallest `max_backoff` a
/// caller may configure.
pub const FEE_ESTIMATE_MIN_BACKOFF: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Worker Pool
// ---------------------------------------------------------------------------

/// Concurrent calls the client runs on its own worker tasks.
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// Jobs that may wait for a worker before callers start running their own.
pub const DEFAULT_WORKER_QUEUE_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns the well-known network name for a ledger id byte string, or `None`
/// for custom ledgers. We don't guess.
pub fn network_name(ledger_id: &[u8]) -> Option<&'static str> {
    match ledger_id {
        [MAINNET_LEDGER_ID] => Some(MAINNET_NAME),
        [TESTNET_LEDGER_ID] => Some(TESTNET_NAME),
        [PREVIEWNET_LEDGER_ID] => Some(PREVIEWNET_NAME),
        _ => None,
    }
}

/// Formats a network name for logs. Custom ledgers get a hex dump.
pub fn network_label(ledger_id: &[u8]) -> String {
    match network_name(ledger_id) {
        Some(name) => name.to_string(),
        None => format!("custom(0x{})", hex::encode(ledger_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_ids_are_distinct() {
        assert_ne!(MAINNET_LEDGER_ID, TESTNET_LEDGER_ID);
        assert_ne!(MAINNET_LEDGER_ID, PREVIEWNET_LEDGER_ID);
        assert_ne!(TESTNET_LEDGER_ID, PREVIEWNET_LEDGER_ID);
    }

    #[test]
    fn test_network_name_for_known_ledgers() {
        assert_eq!(network_name(&[0]), Some("mainnet"));
        assert_eq!(network_name(&[1]), Some("testnet"));
        assert_eq!(network_name(&[2]), Some("previewnet"));
        assert_eq!(network_name(&[9, 9]), None);
    }

    #[test]
    fn test_network_label_formatting() {
        assert_eq!(network_label(&[1]), "testnet");
        assert_eq!(network_label(&[0xCA, 0xFE]), "custom(0xcafe)");
    }

    #[test]
    fn test_backoff_constants_sanity() {
        // A minimum above the maximum would make every retry wait the ceiling.
        assert!(DEFAULT_MIN_BACKOFF < DEFAULT_MAX_BACKOFF);
        assert!(DEFAULT_MIN_NODE_BACKOFF < DEFAULT_MAX_NODE_BACKOFF);
        assert!(DEFAULT_MAX_BACKOFF < DEFAULT_REQUEST_TIMEOUT);
        assert!(FEE_ESTIMATE_MIN_BACKOFF <= DEFAULT_MAX_BACKOFF);
    }

    #[test]
    fn test_wire_magic_is_ascii() {
        assert!(WIRE_MAGIC.iter().all(|b| b.is_ascii_uppercase()));
    }

    #[test]
    fn test_limits_sanity() {
        assert_eq!(GRPC_CERTIFICATE_HASH_LENGTH, 48);
        assert!(MAX_SERVICE_ENDPOINTS < MAX_GOSSIP_ENDPOINTS);
        assert!(DEFAULT_CHUNK_SIZE > 0);
        assert!(DEFAULT_MAX_CHUNKS > 0);
    }
}
