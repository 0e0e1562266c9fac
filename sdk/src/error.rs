//! Error types for the SDK.
//!
//! Every fallible SDK operation returns [`Error`]. Variants line up with how a
//! caller should react: argument and state errors are programming mistakes and
//! are never retried, transport-flavored errors are retried by the execution
//! engine, and rejections are the network telling you "no" on purpose.

use std::fmt;

use thiserror::Error;

use crate::crypto::KeyError;
use crate::execution::ResponseStatus;
use crate::id::{AccountId, TransactionId};

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while building, encoding, or executing requests.
#[derive(Debug, Error)]
pub enum Error {
    /// A setter or constructor received a value it cannot accept.
    #[error("{0}")]
    Argument(String),

    /// The operation is not valid in the current lifecycle state
    /// (mutating after freeze, freezing twice, reading an unset field).
    #[error("{0}")]
    State(String),

    /// An entity id carried a checksum that doesn't match the network.
    #[error(
        "entity id {shard}.{realm}.{num}-{present_checksum} has an invalid checksum \
         (expected {expected_checksum})"
    )]
    BadEntityId {
        /// Shard of the offending id.
        shard: u64,
        /// Realm of the offending id.
        realm: u64,
        /// Number of the offending id.
        num: u64,
        /// The checksum the id was written with.
        present_checksum: String,
        /// The checksum the network expects.
        expected_checksum: String,
    },

    /// Wire bytes were malformed or described a type we don't understand.
    #[error("failed to decode transaction bytes: {0}")]
    Decoding(String),

    /// A value could not be encoded to wire bytes.
    #[error("failed to encode: {0}")]
    Encoding(String),

    /// The request never produced a response (connect failure, reset, timeout).
    #[error("transport error talking to {target}: {message}")]
    Transport {
        /// Address or URL we were talking to.
        target: String,
        /// What went wrong.
        message: String,
    },

    /// The REST service answered with a transient HTTP status.
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The REST service answered with a status that won't get better on retry.
    #[error("request rejected with HTTP status {status}: {body}")]
    HttpRejected {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// A response arrived but did not match the expected schema.
    #[error("failed to parse response: {0}")]
    ResponseParse(String),

    /// A node rejected the transaction at precheck.
    #[error("transaction {transaction_id} failed precheck with status {status}")]
    Precheck {
        /// Status reported by the node.
        status: ResponseStatus,
        /// The transaction (chunk) that was rejected.
        transaction_id: TransactionId,
    },

    /// The overall deadline passed before the call completed.
    #[error("request timed out after {elapsed_ms}ms (timeout: {timeout_ms}ms)")]
    TimedOut {
        /// Milliseconds elapsed before giving up.
        elapsed_ms: u64,
        /// Configured deadline in milliseconds.
        timeout_ms: u64,
    },

    /// Every branch of a fan-out submission failed.
    #[error("all {} nodes failed: {}", .0.len(), describe_failures(.0))]
    AllNodesFailed(Vec<NodeFailure>),

    /// There was no node to send the request to.
    #[error("no nodes available for the request")]
    NoNodes,

    /// Key material could not be parsed.
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl Error {
    /// Shorthand for [`Error::Argument`].
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Shorthand for [`Error::State`].
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Shorthand for [`Error::Decoding`].
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding(message.into())
    }

    /// Shorthand for [`Error::Transport`].
    pub fn transport(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Whether the execution engine may try again after this error.
    ///
    /// Validation, state, decoding and rejection errors describe the request
    /// itself, so sending it again can only produce the same answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::ResponseParse(_) => true,
            Self::HttpStatus { status, .. } => is_transient_http_status(*status),
            _ => false,
        }
    }
}

/// HTTP statuses worth retrying: request timeout, rate limiting, and the
/// server-side family.
pub fn is_transient_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

/// One failed branch of a fan-out submission.
#[derive(Debug)]
pub struct NodeFailure {
    /// The node the branch targeted.
    pub node_account_id: AccountId,
    /// Why it failed.
    pub error: Error,
}

fn describe_failures(failures: &[NodeFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.node_account_id, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_and_parse_errors_are_retryable() {
        assert!(Error::transport("127.0.0.1:50211", "connection reset").is_retryable());
        assert!(Error::ResponseParse("missing field `total`".into()).is_retryable());
    }

    #[test]
    fn test_transient_http_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            let err = Error::HttpStatus {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
        assert!(!is_transient_http_status(400));
        assert!(!is_transient_http_status(404));
    }

    #[test]
    fn test_validation_errors_are_not_retryable() {
        assert!(!Error::argument("bad").is_retryable());
        assert!(!Error::state("frozen").is_retryable());
        assert!(!Error::decoding("garbage").is_retryable());
        assert!(!Error::NoNodes.is_retryable());
        let rejected = Error::HttpRejected {
            status: 400,
            body: "bad request".into(),
        };
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_all_nodes_failed_lists_every_node() {
        let err = Error::AllNodesFailed(vec![
            NodeFailure {
                node_account_id: AccountId::new(0, 0, 3),
                error: Error::transport("a", "refused"),
            },
            NodeFailure {
                node_account_id: AccountId::new(0, 0, 4),
                error: Error::transport("b", "reset"),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("all 2 nodes failed"));
        assert!(message.contains("0.0.3"));
        assert!(message.contains("0.0.4"));
    }

    #[test]
    fn test_timeout_message_carries_both_durations() {
        let err = Error::TimedOut {
            elapsed_ms: 1500,
            timeout_ms: 1000,
        };
        assert_eq!(
            err.to_string(),
            "request timed out after 1500ms (timeout: 1000ms)"
        );
    }
}
