//! Binary transport to service nodes.
//!
//! Requests are the framed transaction bytes from the codec. On a TCP stream
//! each message is prefixed with its length:
//!
//! ```text
//! client -> node : [u32 LE len][frame bytes]
//! node -> client : [u32 LE len][bincode NodeResponse]
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::{from_wire, to_wire};
use crate::config::MAX_WIRE_MESSAGE_SIZE;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Response Status
// ---------------------------------------------------------------------------

/// Precheck status a node reports for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatus {
    Ok,
    Busy,
    PlatformNotActive,
    PlatformTransactionNotCreated,
    InvalidSignature,
    InsufficientPayerBalance,
    InvalidTransaction,
    DuplicateTransaction,
    /// A code this SDK doesn't have a name for.
    Other(i32),
}

impl ResponseStatus {
    /// Statuses that mean "not right now" rather than "no".
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Busy | Self::PlatformNotActive | Self::PlatformTransactionNotCreated
        )
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::Busy => "BUSY",
            Self::PlatformNotActive => "PLATFORM_NOT_ACTIVE",
            Self::PlatformTransactionNotCreated => "PLATFORM_TRANSACTION_NOT_CREATED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InsufficientPayerBalance => "INSUFFICIENT_PAYER_BALANCE",
            Self::InvalidTransaction => "INVALID_TRANSACTION",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::Other(code) => return write!(f, "UNKNOWN({code})"),
        };
        f.write_str(name)
    }
}

/// What a node sends back for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeResponse {
    pub status: ResponseStatus,
}

impl NodeResponse {
    pub fn new(status: ResponseStatus) -> Self {
        Self { status }
    }
}

// ---------------------------------------------------------------------------
// Transport Trait
// ---------------------------------------------------------------------------

/// Sends one request to one node.
///
/// Implementations report connection-level problems as [`Error::Transport`];
/// node verdicts come back inside the [`NodeResponse`].
#[async_trait]
pub trait NodeTransport: Send + Sync {
    async fn submit(&self, address: &str, request: &[u8]) -> Result<NodeResponse>;
}

// ---------------------------------------------------------------------------
// TCP
// ---------------------------------------------------------------------------

/// One TCP connection per request, length-prefixed messages.
#[derive(Debug, Clone)]
pub struct TcpNodeTransport {
    connect_timeout: Duration,
}

impl Default for TcpNodeTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl TcpNodeTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl NodeTransport for TcpNodeTransport {
    async fn submit(&self, address: &str, request: &[u8]) -> Result<NodeResponse> {
        let connect = TcpStream::connect(address);
        let mut stream = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| Error::transport(address, "connect timed out"))?
            .map_err(|e| Error::transport(address, e))?;

        write_message(&mut stream, request)
            .await
            .map_err(|e| Error::transport(address, e))?;
        let reply = read_message(&mut stream)
            .await
            .map_err(|e| Error::transport(address, e))?;

        debug!(address, request_len = request.len(), "node replied");
        from_wire(&reply)
    }
}

/// Writes one length-prefixed message.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Reads one length-prefixed message, refusing anything over the wire limit.
pub async fn read_message<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncReadExt + Unpin,
{
    let len = reader.read_u32_le().await? as u64;
    if len > MAX_WIRE_MESSAGE_SIZE {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("message of {len} bytes exceeds the wire limit"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Encodes a response the way a node would. Used by test doubles.
pub fn encode_response(response: &NodeResponse) -> Result<Vec<u8>> {
    to_wire(response)
}
