//! # Client
//!
//! Everything a call needs from its surroundings: the node pool, mirror
//! addresses, the operator that pays for and signs transactions, default
//! retry settings, the transports, and the worker pool independent calls run
//! on.
//!
//! `Client` is a handle around an `Arc`, so clones share one pool and one
//! set of node health records.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config;
use crate::crypto::PrivateKey;
use crate::error::{Error, Result};
use crate::execution::{
    HttpTransport, NodeTransport, ReqwestTransport, RetryPolicy, TcpNodeTransport,
    TransactionResponse,
};
use crate::id::{AccountId, LedgerId};
use crate::network::{NodePool, WorkerPool};
use crate::transaction::AnyTransaction;

// ---------------------------------------------------------------------------
// Operator
// ---------------------------------------------------------------------------

/// The account that pays for transactions and the key that signs for it.
#[derive(Debug, Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub private_key: PrivateKey,
}

impl Operator {
    pub fn new(account_id: AccountId, private_key: PrivateKey) -> Self {
        Self {
            account_id,
            private_key,
        }
    }
}

// ---------------------------------------------------------------------------
// Config File
// ---------------------------------------------------------------------------

/// JSON client configuration. Durations are in milliseconds; anything left
/// out keeps its default.
///
/// ```json
/// {
///   "network": { "127.0.0.1:50211": "0.0.3" },
///   "mirrorNetwork": ["localhost:5551"],
///   "networkName": "testnet",
///   "operator": { "accountId": "0.0.2", "privateKey": "<64 hex chars>" },
///   "maxAttempts": 5
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Node address to node account id.
    pub network: BTreeMap<String, String>,
    pub mirror_network: Vec<String>,
    pub network_name: Option<String>,
    pub operator: Option<OperatorConfig>,
    pub max_attempts: Option<u32>,
    pub min_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub max_nodes_per_request: Option<usize>,
    pub worker_count: Option<usize>,
    pub worker_queue_capacity: Option<usize>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorConfig {
    pub account_id: String,
    pub private_key: String,
}

impl fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("account_id", &self.account_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ClientConfig {
    /// Turns the file form into a builder, parsing ids and keys on the way.
    pub fn into_builder(self) -> Result<ClientBuilder> {
        let network = self
            .network
            .into_iter()
            .map(|(address, id)| Ok((address, id.parse::<AccountId>()?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        let mut builder = Client::builder()
            .network(network)
            .mirror_network(self.mirror_network);

        if let Some(name) = self.network_name {
            builder = builder.ledger_id(LedgerId::from_name(&name)?);
        }
        if let Some(operator) = self.operator {
            let account_id = operator.account_id.parse::<AccountId>()?;
            let private_key = PrivateKey::from_hex(&operator.private_key)?;
            builder = builder.operator(account_id, private_key);
        }
        if let Some(max_attempts) = self.max_attempts {
            builder = builder.max_attempts(max_attempts);
        }
        if let Some(ms) = self.min_backoff_ms {
            builder = builder.min_backoff(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_backoff_ms {
            builder = builder.max_backoff(Duration::from_millis(ms));
        }
        if let Some(ms) = self.request_timeout_ms {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = self.max_nodes_per_request {
            builder = builder.max_nodes_per_request(max);
        }
        if let Some(workers) = self.worker_count {
            builder = builder.worker_count(workers);
        }
        if let Some(capacity) = self.worker_queue_capacity {
            builder = builder.worker_queue_capacity(capacity);
        }
        Ok(builder)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles a [`Client`]. Transports default to TCP for nodes and reqwest
/// for the mirror.
pub struct ClientBuilder {
    network: BTreeMap<String, AccountId>,
    mirror_network: Vec<String>,
    ledger_id: Option<LedgerId>,
    operator: Option<Operator>,
    retry_policy: RetryPolicy,
    max_nodes_per_request: usize,
    worker_count: usize,
    worker_queue_capacity: usize,
    node_transport: Option<Arc<dyn NodeTransport>>,
    http_transport: Option<Arc<dyn HttpTransport>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            network: BTreeMap::new(),
            mirror_network: Vec::new(),
            ledger_id: None,
            operator: None,
            retry_policy: RetryPolicy::default(),
            max_nodes_per_request: 0,
            worker_count: config::DEFAULT_WORKER_COUNT,
            worker_queue_capacity: config::DEFAULT_WORKER_QUEUE_CAPACITY,
            node_transport: None,
            http_transport: None,
        }
    }
}

impl ClientBuilder {
    /// Node address to node account id.
    pub fn network(mut self, network: BTreeMap<String, AccountId>) -> Self {
        self.network = network;
        self
    }

    pub fn mirror_network(mut self, mirror_network: Vec<String>) -> Self {
        self.mirror_network = mirror_network;
        self
    }

    /// Entity checksums are validated against this ledger before submission.
    pub fn ledger_id(mut self, ledger_id: LedgerId) -> Self {
        self.ledger_id = Some(ledger_id);
        self
    }

    pub fn operator(mut self, account_id: AccountId, private_key: PrivateKey) -> Self {
        self.operator = Some(Operator::new(account_id, private_key));
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry_policy.max_attempts = max_attempts;
        self
    }

    pub fn min_backoff(mut self, min_backoff: Duration) -> Self {
        self.retry_policy.min_backoff = min_backoff;
        self
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.retry_policy.max_backoff = max_backoff;
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.retry_policy.request_timeout = request_timeout;
        self
    }

    /// `0` leaves requests uncapped.
    pub fn max_nodes_per_request(mut self, max: usize) -> Self {
        self.max_nodes_per_request = max;
        self
    }

    pub fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    pub fn worker_queue_capacity(mut self, capacity: usize) -> Self {
        self.worker_queue_capacity = capacity;
        self
    }

    pub fn node_transport(mut self, transport: Arc<dyn NodeTransport>) -> Self {
        self.node_transport = Some(transport);
        self
    }

    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http_transport = Some(transport);
        self
    }

    /// Validates the retry settings and builds the client. An empty network
    /// is allowed; calls fail with [`Error::NoNodes`] until nodes are set.
    pub fn build(self) -> Result<Client> {
        self.retry_policy.validate()?;

        let network = NodePool::new(self.network);
        network.set_max_nodes_per_request(self.max_nodes_per_request);

        let node_transport = self
            .node_transport
            .unwrap_or_else(|| Arc::new(TcpNodeTransport::default()));
        let http_transport = self
            .http_transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::default()));

        info!(
            nodes = network.len(),
            mirrors = self.mirror_network.len(),
            ledger = ?self.ledger_id,
            operator = ?self.operator.as_ref().map(|op| op.account_id.to_string()),
            "client built"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                network,
                mirror_network: self.mirror_network,
                ledger_id: self.ledger_id,
                operator: self.operator,
                retry_policy: self.retry_policy,
                node_transport,
                http_transport,
                workers: WorkerPool::new(self.worker_count, self.worker_queue_capacity),
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct ClientInner {
    network: NodePool,
    mirror_network: Vec<String>,
    ledger_id: Option<LedgerId>,
    operator: Option<Operator>,
    retry_policy: RetryPolicy,
    node_transport: Arc<dyn NodeTransport>,
    http_transport: Arc<dyn HttpTransport>,
    workers: WorkerPool,
}

/// Shared handle to a configured network.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// A client for `network` with default settings and no operator.
    pub fn for_network(network: BTreeMap<String, AccountId>) -> Result<Self> {
        Self::builder().network(network).build()
    }

    /// A testnet client for the given nodes and mirrors.
    pub fn for_testnet_with(
        network: BTreeMap<String, AccountId>,
        mirror_network: Vec<String>,
    ) -> Result<Self> {
        Self::builder()
            .network(network)
            .mirror_network(mirror_network)
            .ledger_id(LedgerId::Testnet)
            .build()
    }

    /// Parses a JSON [`ClientConfig`].
    pub fn from_config_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json)
            .map_err(|e| Error::argument(format!("invalid client config: {e}")))?;
        config.into_builder()?.build()
    }

    /// Reads and parses a JSON [`ClientConfig`] file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::argument(format!("failed to read client config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loading client config");
        Self::from_config_json(&json)
    }

    pub fn network(&self) -> &NodePool {
        &self.inner.network
    }

    pub fn mirror_network(&self) -> &[String] {
        &self.inner.mirror_network
    }

    pub fn ledger_id(&self) -> Option<&LedgerId> {
        self.inner.ledger_id.as_ref()
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.inner.operator.as_ref()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.inner.retry_policy
    }

    pub fn node_transport(&self) -> &Arc<dyn NodeTransport> {
        &self.inner.node_transport
    }

    pub fn http_transport(&self) -> &Arc<dyn HttpTransport> {
        &self.inner.http_transport
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.inner.workers
    }

    /// Executes independent transactions concurrently on the worker pool.
    /// Results come back in input order; one failure does not stop the rest.
    pub async fn execute_batch(
        &self,
        transactions: Vec<AnyTransaction>,
    ) -> Vec<Result<TransactionResponse>> {
        debug!(count = transactions.len(), "executing batch");
        let runs = transactions.into_iter().map(|mut transaction| {
            let client = self.clone();
            self.inner.workers.run(async move {
                transaction.execute(&client).await
            })
        });
        join_all(runs)
            .await
            .into_iter()
            .map(|joined| joined.and_then(|result| result))
            .collect()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("network", &self.inner.network)
            .field("mirror_network", &self.inner.mirror_network)
            .field("ledger_id", &self.inner.ledger_id)
            .field(
                "operator",
                &self.inner.operator.as_ref().map(|op| &op.account_id),
            )
            .field("retry_policy", &self.inner.retry_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn config_json_round_trips_into_a_client() {
        let json = format!(
            r#"{{
                "network": {{ "127.0.0.1:50211": "0.0.3", "127.0.0.1:50212": "0.0.4" }},
                "mirrorNetwork": ["localhost:5551"],
                "networkName": "testnet",
                "operator": {{ "accountId": "0.0.2", "privateKey": "{KEY_HEX}" }},
                "maxAttempts": 4,
                "maxNodesPerRequest": 1
            }}"#
        );
        let client = Client::from_config_json(&json).unwrap();
        assert_eq!(client.network().len(), 2);
        assert_eq!(client.network().number_of_nodes_for_request(), 1);
        assert_eq!(client.mirror_network(), ["localhost:5551".to_string()]);
        assert_eq!(client.ledger_id(), Some(&LedgerId::Testnet));
        assert_eq!(client.retry_policy().max_attempts, 4);
        assert_eq!(
            client.operator().unwrap().account_id,
            AccountId::from_num(2)
        );
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{ "network": { "10.0.0.1:50211": "0.0.3" } }"#).unwrap();
        let client = Client::from_config_file(&path).unwrap();
        assert_eq!(client.network().len(), 1);
        assert!(client.operator().is_none());
        assert_eq!(client.retry_policy(), &RetryPolicy::default());
    }

    #[test]
    fn bad_config_is_an_argument_error() {
        assert!(matches!(
            Client::from_config_json("{ not json"),
            Err(Error::Argument(_))
        ));
        assert!(Client::from_config_json(r#"{ "network": { "a:1": "zero" } }"#).is_err());
        let inverted = r#"{ "minBackoffMs": 9000, "maxBackoffMs": 1000 }"#;
        assert!(matches!(
            Client::from_config_json(inverted),
            Err(Error::Argument(_))
        ));
    }

    #[test]
    fn operator_key_is_not_printed() {
        let config = OperatorConfig {
            account_id: "0.0.2".into(),
            private_key: KEY_HEX.into(),
        };
        assert!(!format!("{config:?}").contains(KEY_HEX));
    }

    #[test]
    fn clones_share_node_health() {
        let network = BTreeMap::from([("10.0.0.1:50211".to_string(), AccountId::from_num(3))]);
        let client = Client::for_testnet_with(network, vec![]).unwrap();
        let clone = client.clone();
        clone.network().mark_unhealthy(&AccountId::from_num(3));
        assert!(!client
            .network()
            .node(&AccountId::from_num(3))
            .unwrap()
            .is_healthy());
    }
}
