//! Submitting frozen transactions to nodes.
//!
//! Each chunk is its own logical call with its own retry loop. Chunks go out
//! in order, and chunk `n + 1` is not sent until chunk `n` was accepted.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::retry::{execute_with_retry, AttemptOutcome, RetryPolicy};
use super::transport::{NodeResponse, ResponseStatus};
use crate::client::Client;
use crate::codec::{frame, FrameKind};
use crate::crypto::sha384;
use crate::error::{Error, NodeFailure, Result};
use crate::id::{AccountId, TransactionId};
use crate::network::Node;
use crate::transaction::{Transaction, TransactionData};

/// What a node said when it accepted a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    pub node_id: AccountId,
    pub transaction_id: TransactionId,
    /// SHA-384 of the signed bytes that node received.
    pub transaction_hash: [u8; 48],
}

impl TransactionResponse {
    pub fn transaction_hash_hex(&self) -> String {
        hex::encode(self.transaction_hash)
    }
}

/// One (node, chunk) request, ready to send.
struct PreparedRequest {
    frame: Vec<u8>,
    hash: [u8; 48],
}

impl<D: TransactionData> Transaction<D> {
    /// Freezes with `client` if needed, signs with its operator if there is
    /// one, and submits every chunk. Returns the first chunk's response.
    pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
        self.execute_all(client)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoNodes)
    }

    /// Like [`execute`](Self::execute), returning one response per chunk.
    pub async fn execute_all(&mut self, client: &Client) -> Result<Vec<TransactionResponse>> {
        let (policy, nodes) = self.prepare_for_submission(client)?;
        let mut responses = Vec::with_capacity(self.chunk_count());
        for chunk_index in 0..self.chunk_count() {
            let response = self
                .submit_chunk(client, &policy, &nodes, chunk_index)
                .await?;
            responses.push(response);
        }
        Ok(responses)
    }

    /// Sends each chunk to up to `width` nodes at once. The first node to
    /// accept wins and the other in-flight requests are aborted. Fails with
    /// [`Error::AllNodesFailed`] when no node accepts.
    pub async fn execute_fan_out(
        &mut self,
        client: &Client,
        width: usize,
    ) -> Result<TransactionResponse> {
        let (policy, nodes) = self.prepare_for_submission(client)?;
        let mut first = None;
        for chunk_index in 0..self.chunk_count() {
            let fan_out = self.fan_out_chunk(client, &nodes, chunk_index, width.max(1));
            let started = Instant::now();
            let response = match tokio::time::timeout(policy.request_timeout, fan_out).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(Error::TimedOut {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        timeout_ms: policy.request_timeout.as_millis() as u64,
                    })
                }
            };
            first.get_or_insert(response);
        }
        first.ok_or(Error::NoNodes)
    }

    fn prepare_for_submission(&mut self, client: &Client) -> Result<(RetryPolicy, Vec<AccountId>)> {
        if let Some(ledger) = client.ledger_id() {
            self.validate_checksums(ledger)?;
        }
        if !self.is_frozen() {
            self.freeze_with_client(client)?;
        }
        if client.operator().is_some() {
            self.sign_with_operator(client)?;
        }
        let policy = self.retry_policy(client.retry_policy())?;
        let nodes = self.node_account_ids().map(<[_]>::to_vec).unwrap_or_default();
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }
        Ok((policy, nodes))
    }

    fn prepare_request(&self, node_id: &AccountId, chunk_index: usize) -> Result<PreparedRequest> {
        let signed = self.signed_transaction_bytes(node_id, chunk_index)?;
        Ok(PreparedRequest {
            hash: sha384(&signed),
            frame: frame(FrameKind::SignedTransaction, &signed)?,
        })
    }

    async fn submit_chunk(
        &self,
        client: &Client,
        policy: &RetryPolicy,
        nodes: &[AccountId],
        chunk_index: usize,
    ) -> Result<TransactionResponse> {
        let transaction_id = self.chunk_transaction_ids()[chunk_index].clone();
        let label = format!("{} {transaction_id}", D::NAME);

        execute_with_retry(policy, &label, |attempt| {
            let node = client.network().select_node(nodes);
            let transaction_id = transaction_id.clone();
            async move {
                let Some(node) = node else {
                    return AttemptOutcome::Fatal(Error::NoNodes);
                };
                // Every candidate is benched: sit out the rest of this one's penalty.
                if let Some(until) = node.readmit_at().filter(|until| *until > Instant::now()) {
                    let delay = until.saturating_duration_since(Instant::now());
                    warn!(
                        node = %node.account_id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Node is backed off, waiting {} ms before next attempt",
                        delay.as_millis()
                    );
                    tokio::time::sleep_until(until).await;
                }
                debug!(node = %node.account_id(), attempt, chunk = chunk_index, "submitting");
                self.attempt_on_node(client, &node, chunk_index, transaction_id)
                    .await
            }
        })
        .await
    }

    async fn attempt_on_node(
        &self,
        client: &Client,
        node: &Node,
        chunk_index: usize,
        transaction_id: TransactionId,
    ) -> AttemptOutcome<TransactionResponse> {
        let request = match self.prepare_request(node.account_id(), chunk_index) {
            Ok(request) => request,
            Err(error) => return AttemptOutcome::Fatal(error),
        };

        let node_id = node.account_id().clone();
        match client
            .node_transport()
            .submit(node.address(), &request.frame)
            .await
        {
            Ok(response) => {
                classify_response(client, node_id, transaction_id, request.hash, response)
            }
            Err(error) if error.is_retryable() => {
                client.network().mark_unhealthy(&node_id);
                AttemptOutcome::NextNode(error)
            }
            Err(error) => AttemptOutcome::Fatal(error),
        }
    }

    async fn fan_out_chunk(
        &self,
        client: &Client,
        nodes: &[AccountId],
        chunk_index: usize,
        width: usize,
    ) -> Result<TransactionResponse> {
        let transaction_id = self.chunk_transaction_ids()[chunk_index].clone();

        // Healthy nodes first, keeping the frozen order within each group.
        let (mut targets, benched): (Vec<Arc<Node>>, Vec<Arc<Node>>) = nodes
            .iter()
            .filter_map(|id| client.network().node(id))
            .partition(|node| node.is_healthy());
        targets.extend(benched);
        targets.truncate(width);
        if targets.is_empty() {
            return Err(Error::NoNodes);
        }

        let mut in_flight = JoinSet::new();
        let mut sent = Vec::with_capacity(targets.len());
        for node in &targets {
            let request = self.prepare_request(node.account_id(), chunk_index)?;
            sent.push(node.account_id().clone());
            let node = Arc::clone(node);
            let transport = Arc::clone(client.node_transport());
            in_flight.spawn(async move {
                let result = transport.submit(node.address(), &request.frame).await;
                (node.account_id().clone(), request.hash, result)
            });
        }
        debug!(chunk = chunk_index, width = targets.len(), "fan-out started");

        let mut failures = Vec::new();
        while let Some(joined) = in_flight.join_next().await {
            let Ok((node_id, hash, result)) = joined else {
                continue;
            };
            let error = match result {
                Ok(response) => match classify_response(
                    client,
                    node_id.clone(),
                    transaction_id.clone(),
                    hash,
                    response,
                ) {
                    AttemptOutcome::Success(response) => {
                        in_flight.abort_all();
                        info!(node = %node_id, chunk = chunk_index, "fan-out won");
                        return Ok(response);
                    }
                    AttemptOutcome::Retry(error)
                    | AttemptOutcome::NextNode(error)
                    | AttemptOutcome::Fatal(error) => error,
                },
                Err(error) => {
                    if error.is_retryable() {
                        client.network().mark_unhealthy(&node_id);
                    }
                    error
                }
            };
            failures.push(NodeFailure {
                node_account_id: node_id,
                error,
            });
        }

        // Branches that panicked never reported back.
        for node_id in sent {
            if !failures.iter().any(|f| f.node_account_id == node_id) {
                failures.push(NodeFailure {
                    node_account_id: node_id,
                    error: Error::state("submission task ended without a result"),
                });
            }
        }
        warn!(chunk = chunk_index, failures = failures.len(), "every fan-out branch failed");
        Err(Error::AllNodesFailed(failures))
    }
}

/// Maps a node's precheck verdict onto the retry loop's outcomes.
fn classify_response(
    client: &Client,
    node_id: AccountId,
    transaction_id: TransactionId,
    transaction_hash: [u8; 48],
    response: NodeResponse,
) -> AttemptOutcome<TransactionResponse> {
    match response.status {
        ResponseStatus::Ok => {
            client.network().mark_healthy(&node_id);
            AttemptOutcome::Success(TransactionResponse {
                node_id,
                transaction_id,
                transaction_hash,
            })
        }
        status if status.is_retryable() => AttemptOutcome::Retry(Error::Precheck {
            status,
            transaction_id,
        }),
        status => AttemptOutcome::Fatal(Error::Precheck {
            status,
            transaction_id,
        }),
    }
}
