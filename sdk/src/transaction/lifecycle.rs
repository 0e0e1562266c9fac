//! The shared transaction lifecycle: `Draft -> Frozen -> Signed`.
//!
//! Every concrete transaction is a [`Transaction<D>`] where `D` carries the
//! kind-specific fields. This type owns everything the kinds have in common:
//! the node list, the transaction id, fee and memo, chunk identities, the
//! signature store, and the encode/decode glue.
//!
//! Mutation is guarded by one helper, [`Transaction::require_not_frozen`].
//! Every setter, here or on a concrete type, calls it first. Execution
//! settings (attempts, backoff, timeout) are the exception: they shape how a
//! frozen transaction gets *sent*, not what it *says*, so they stay writable.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::time::Duration;

use tracing::{debug, info};

use super::chunk::{ChunkPlan, ChunkRange};
use super::signatures::SignatureStore;
use crate::client::Client;
use crate::codec::{
    self, encode_signed, encode_transaction_list, frame, to_wire, BodyData, DecodedEntry,
    FrameKind, ScheduledBody, TransactionBody,
};
use crate::config;
use crate::crypto::{sha384, PublicKey, TransactionSigner};
use crate::error::{Error, Result};
use crate::execution::RetryPolicy;
use crate::id::{AccountId, LedgerId, TransactionId, ValidateChecksums};

// ---------------------------------------------------------------------------
// Kind-specific Data
// ---------------------------------------------------------------------------

/// Implemented by the field set of every concrete transaction kind.
pub trait TransactionData:
    Clone + fmt::Debug + Default + ValidateChecksums + Send + Sync + 'static
{
    /// Type name used in error messages, e.g. `"NodeDeleteTransaction"`.
    const NAME: &'static str;

    /// Fails with a state error naming any mandatory field that is unset.
    fn check_freeze(&self) -> Result<()> {
        Ok(())
    }

    /// `Some` for payload-bearing kinds that split into chunks.
    fn chunk_plan(&self) -> Option<ChunkPlan> {
        None
    }

    /// Wire data for one chunk. Non-chunked kinds ignore `chunk`.
    fn body_data(&self, chunk: &ChunkRange) -> Result<BodyData>;

    /// Rebuilds the fields from decoded body data, one entry per chunk in
    /// chunk order.
    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self>;

    /// Whether this kind may be wrapped in a schedule.
    fn is_schedulable(&self) -> bool {
        true
    }

    /// Deterministic rendering of the fields for [`Transaction::to_canonical_string`].
    /// Kinds override this to leave out local-only settings.
    fn canonical_fields(&self) -> String {
        format!("{self:?}")
    }
}

/// Unwraps the data of a non-chunked kind, rejecting multi-chunk input.
pub(crate) fn single_chunk<D: TransactionData>(mut chunks: Vec<BodyData>) -> Result<BodyData> {
    if chunks.len() != 1 {
        return Err(Error::decoding(format!(
            "{} does not support chunking but {} chunks were found",
            D::NAME,
            chunks.len()
        )));
    }
    Ok(chunks.remove(0))
}

/// The decoding error for body data of the wrong kind.
pub(crate) fn unexpected_body<D: TransactionData>(data: &BodyData) -> Error {
    Error::decoding(format!("expected {} body, found {}", D::NAME, data.kind()))
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where a transaction is in its lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Draft,
    Frozen,
    Signed,
}

/// One (node, chunk) body ready for signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignableNodeBody {
    pub node_account_id: AccountId,
    pub transaction_id: TransactionId,
    pub chunk_index: usize,
    pub body_bytes: Vec<u8>,
}

/// Per-transaction overrides of the client's retry policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExecutionOverrides {
    max_attempts: Option<u32>,
    min_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    request_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A transaction of kind `D`.
///
/// Not meant for concurrent mutation: share it behind your own lock if you
/// must, or better, don't.
#[derive(Clone)]
pub struct Transaction<D> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    transaction_id: Option<TransactionId>,
    max_transaction_fee: Option<u64>,
    valid_duration: Duration,
    memo: String,
    frozen: bool,
    chunk_ids: Vec<TransactionId>,
    chunk_ranges: Vec<ChunkRange>,
    signatures: SignatureStore,
    execution: ExecutionOverrides,
}

impl<D: TransactionData> Default for Transaction<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TransactionData> Transaction<D> {
    pub fn new() -> Self {
        Self {
            data: D::default(),
            node_account_ids: None,
            transaction_id: None,
            max_transaction_fee: None,
            valid_duration: config::DEFAULT_TRANSACTION_VALID_DURATION,
            memo: String::new(),
            frozen: false,
            chunk_ids: Vec::new(),
            chunk_ranges: Vec::new(),
            signatures: SignatureStore::new(),
            execution: ExecutionOverrides::default(),
        }
    }

    // -- state ------------------------------------------------------------

    pub fn state(&self) -> TransactionState {
        match (self.frozen, self.signatures.is_empty()) {
            (false, _) => TransactionState::Draft,
            (true, true) => TransactionState::Frozen,
            (true, false) => TransactionState::Signed,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The one guard every field mutator goes through.
    pub fn require_not_frozen(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::state(
                "transaction is immutable; it has at least one signature or has been explicitly frozen",
            ));
        }
        Ok(())
    }

    fn require_frozen(&self, action: &str) -> Result<()> {
        if !self.frozen {
            return Err(Error::state(format!(
                "{} must be frozen before {action}",
                D::NAME
            )));
        }
        Ok(())
    }

    /// Read access to the kind-specific fields.
    pub fn data(&self) -> &D {
        &self.data
    }

    /// Guarded write access for concrete setters.
    pub(crate) fn data_mut(&mut self) -> Result<&mut D> {
        self.require_not_frozen()?;
        Ok(&mut self.data)
    }

    // -- common fields ----------------------------------------------------

    pub fn set_node_account_ids(&mut self, node_ids: Vec<AccountId>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if node_ids.is_empty() {
            return Err(Error::argument("node account ids must not be empty"));
        }
        self.node_account_ids = Some(node_ids);
        Ok(self)
    }

    pub fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.node_account_ids.as_deref()
    }

    pub fn set_transaction_id(&mut self, transaction_id: TransactionId) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.transaction_id = Some(transaction_id);
        Ok(self)
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    pub fn set_max_transaction_fee(&mut self, fee: u64) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.max_transaction_fee = Some(fee);
        Ok(self)
    }

    /// The fee ceiling, or the SDK default when never set.
    pub fn max_transaction_fee(&self) -> u64 {
        self.max_transaction_fee
            .unwrap_or(config::DEFAULT_MAX_TRANSACTION_FEE)
    }

    pub fn set_transaction_valid_duration(&mut self, duration: Duration) -> Result<&mut Self> {
        self.require_not_frozen()?;
        self.valid_duration = duration;
        Ok(self)
    }

    pub fn transaction_valid_duration(&self) -> Duration {
        self.valid_duration
    }

    pub fn set_transaction_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.require_not_frozen()?;
        let memo = memo.into();
        if memo.len() > config::MAX_MEMO_BYTES {
            return Err(Error::argument(format!(
                "memo must not exceed {} bytes when encoded as UTF-8",
                config::MAX_MEMO_BYTES
            )));
        }
        self.memo = memo;
        Ok(self)
    }

    pub fn transaction_memo(&self) -> &str {
        &self.memo
    }

    // -- execution settings (allowed in every state) -----------------------

    pub fn set_max_attempts(&mut self, max_attempts: u32) -> Result<&mut Self> {
        if max_attempts == 0 {
            return Err(Error::argument("maxAttempts must be greater than zero"));
        }
        self.execution.max_attempts = Some(max_attempts);
        Ok(self)
    }

    pub fn set_min_backoff(&mut self, min_backoff: Duration) -> Result<&mut Self> {
        if let Some(max) = self.execution.max_backoff {
            if min_backoff > max {
                return Err(Error::argument("minBackoff must not exceed maxBackoff"));
            }
        }
        self.execution.min_backoff = Some(min_backoff);
        Ok(self)
    }

    pub fn set_max_backoff(&mut self, max_backoff: Duration) -> Result<&mut Self> {
        if let Some(min) = self.execution.min_backoff {
            if max_backoff < min {
                return Err(Error::argument("maxBackoff must not be below minBackoff"));
            }
        }
        self.execution.max_backoff = Some(max_backoff);
        Ok(self)
    }

    pub fn set_request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.execution.request_timeout = Some(timeout);
        self
    }

    /// `base` with this transaction's overrides applied.
    pub fn retry_policy(&self, base: &RetryPolicy) -> Result<RetryPolicy> {
        let policy = RetryPolicy {
            max_attempts: self.execution.max_attempts.unwrap_or(base.max_attempts),
            min_backoff: self.execution.min_backoff.unwrap_or(base.min_backoff),
            max_backoff: self.execution.max_backoff.unwrap_or(base.max_backoff),
            request_timeout: self
                .execution
                .request_timeout
                .unwrap_or(base.request_timeout),
        };
        policy.validate()?;
        Ok(policy)
    }

    // -- freeze -------------------------------------------------------------

    /// Freezes with the node ids and transaction id set earlier.
    pub fn freeze(&mut self) -> Result<&mut Self> {
        if self.frozen {
            return Err(Error::state(format!("{} is already frozen", D::NAME)));
        }
        self.data.check_freeze()?;

        let node_count = match &self.node_account_ids {
            Some(ids) if !ids.is_empty() => ids.len(),
            _ => {
                return Err(Error::state(format!(
                    "{}: 'nodeAccountIds' must be set before calling freeze()",
                    D::NAME
                )))
            }
        };
        let Some(base_id) = self.transaction_id.clone() else {
            return Err(Error::state(format!(
                "{}: 'transactionId' must be set before calling freeze()",
                D::NAME
            )));
        };

        let ranges = match self.data.chunk_plan() {
            Some(plan) => plan.ranges()?,
            None => vec![ChunkRange::whole(0)],
        };
        self.chunk_ids = ranges.iter().map(|r| base_id.for_chunk(r.index)).collect();
        self.chunk_ranges = ranges;
        self.frozen = true;

        info!(
            kind = D::NAME,
            transaction_id = %base_id,
            nodes = node_count,
            chunks = self.chunk_ids.len(),
            "transaction frozen"
        );
        Ok(self)
    }

    /// Binds `node_ids` and `transaction_id`, then freezes.
    pub fn freeze_with(
        &mut self,
        node_ids: &[AccountId],
        transaction_id: TransactionId,
    ) -> Result<&mut Self> {
        if self.frozen {
            return Err(Error::state(format!("{} is already frozen", D::NAME)));
        }
        if node_ids.is_empty() {
            return Err(Error::state(format!(
                "{}: freeze requires at least one node account id",
                D::NAME
            )));
        }
        self.node_account_ids = Some(node_ids.to_vec());
        self.transaction_id = Some(transaction_id);
        self.freeze()
    }

    /// Fills in whatever is missing from `client` (nodes from the pool, a
    /// fresh transaction id from the operator) and freezes.
    pub fn freeze_with_client(&mut self, client: &Client) -> Result<&mut Self> {
        if self.frozen {
            return Err(Error::state(format!("{} is already frozen", D::NAME)));
        }
        if self.node_account_ids.is_none() {
            let nodes = client.network().nodes_for_request();
            if nodes.is_empty() {
                return Err(Error::NoNodes);
            }
            self.node_account_ids = Some(nodes);
        }
        if self.transaction_id.is_none() {
            let operator = client.operator().ok_or_else(|| {
                Error::state("client has no operator; set a transaction id before freezing")
            })?;
            self.transaction_id = Some(TransactionId::generate(operator.account_id.clone()));
        }
        self.freeze()
    }

    // -- chunks & bodies ----------------------------------------------------

    /// Number of chunks. Zero until frozen.
    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }

    /// Per-chunk transaction ids in chunk order. Empty until frozen.
    pub fn chunk_transaction_ids(&self) -> &[TransactionId] {
        &self.chunk_ids
    }

    fn frozen_nodes(&self) -> &[AccountId] {
        match (&self.node_account_ids, self.frozen) {
            (Some(ids), true) => ids,
            _ => &[],
        }
    }

    fn body_for(&self, node_id: &AccountId, chunk_index: usize) -> Result<TransactionBody> {
        Ok(TransactionBody {
            transaction_id: Some(self.chunk_ids[chunk_index].clone()),
            node_account_id: Some(node_id.clone()),
            transaction_fee: self.max_transaction_fee(),
            valid_duration_secs: self.valid_duration.as_secs(),
            memo: self.memo.clone(),
            data: self.data.body_data(&self.chunk_ranges[chunk_index])?,
        })
    }

    fn draft_body(&self) -> Result<TransactionBody> {
        let payload_len = self.data.chunk_plan().map_or(0, |p| p.payload_len);
        Ok(TransactionBody {
            transaction_id: self.transaction_id.clone(),
            node_account_id: None,
            transaction_fee: self.max_transaction_fee(),
            valid_duration_secs: self.valid_duration.as_secs(),
            memo: self.memo.clone(),
            data: self.data.body_data(&ChunkRange::whole(payload_len))?,
        })
    }

    /// Every (node, chunk) body, node-major then chunk-minor. Length is
    /// `nodes x chunks`.
    pub fn signable_node_bodies(&self) -> Result<Vec<SignableNodeBody>> {
        self.require_frozen("signable bodies can be produced")?;
        let mut bodies = Vec::with_capacity(self.frozen_nodes().len() * self.chunk_count());
        for node_id in self.frozen_nodes() {
            for (chunk_index, transaction_id) in self.chunk_ids.iter().enumerate() {
                let body = self.body_for(node_id, chunk_index)?;
                bodies.push(SignableNodeBody {
                    node_account_id: node_id.clone(),
                    transaction_id: transaction_id.clone(),
                    chunk_index,
                    body_bytes: to_wire(&body)?,
                });
            }
        }
        Ok(bodies)
    }

    // -- signatures ---------------------------------------------------------

    /// Signs every (node, chunk) body with `signer`.
    pub fn sign(&mut self, signer: &dyn TransactionSigner) -> Result<&mut Self> {
        self.require_frozen("signing")?;
        let public_key = signer.public_key();
        for body in self.signable_node_bodies()? {
            let signature = signer.sign_message(&body.body_bytes);
            self.signatures
                .insert(body.node_account_id, body.chunk_index, public_key, signature);
        }
        debug!(kind = D::NAME, signer = %public_key, "transaction signed");
        Ok(self)
    }

    /// Signs with the client's operator key, once.
    pub fn sign_with_operator(&mut self, client: &Client) -> Result<&mut Self> {
        let operator = client
            .operator()
            .ok_or_else(|| Error::state("client has no operator to sign with"))?;
        if self.is_signed_by(&operator.private_key.public_key()) {
            return Ok(self);
        }
        self.sign(&operator.private_key)
    }

    /// Whether `public_key` has signed every (node, chunk) pair.
    pub fn is_signed_by(&self, public_key: &PublicKey) -> bool {
        if !self.frozen {
            return false;
        }
        let pairs = self
            .frozen_nodes()
            .iter()
            .flat_map(|node| (0..self.chunk_count()).map(move |chunk| (node.clone(), chunk)));
        self.signatures.has_signed_all(public_key, pairs)
    }

    /// Records an externally produced signature for one (node, chunk) pair.
    ///
    /// Quietly ignored when the transaction isn't frozen, `node_id` isn't one
    /// of the frozen nodes, or `transaction_id` matches no chunk. A repeat
    /// signature from the same key replaces the earlier one.
    pub fn add_signature(
        &mut self,
        public_key: PublicKey,
        signature: Vec<u8>,
        transaction_id: &TransactionId,
        node_id: &AccountId,
    ) -> &mut Self {
        if !self.frozen || self.chunk_ids.is_empty() {
            return self;
        }
        if !self.frozen_nodes().contains(node_id) {
            debug!(node = %node_id, "signature for unknown node dropped");
            return self;
        }
        let Some(chunk_index) = self.chunk_ids.iter().position(|id| id == transaction_id) else {
            debug!(transaction_id = %transaction_id, "signature for unknown chunk dropped");
            return self;
        };
        self.signatures
            .insert(node_id.clone(), chunk_index, public_key, signature);
        self
    }

    /// node -> public key -> signature, for the first chunk.
    pub fn signatures(&self) -> BTreeMap<AccountId, BTreeMap<PublicKey, Vec<u8>>> {
        self.signatures.project(0)
    }

    /// The same view for the chunk identified by `transaction_id`. Empty for
    /// an unknown id.
    pub fn signatures_for(
        &self,
        transaction_id: &TransactionId,
    ) -> BTreeMap<AccountId, BTreeMap<PublicKey, Vec<u8>>> {
        match self.chunk_ids.iter().position(|id| id == transaction_id) {
            Some(chunk_index) => self.signatures.project(chunk_index),
            None => BTreeMap::new(),
        }
    }

    // -- encoding -----------------------------------------------------------

    /// `WireSignedTransaction` bytes for one frozen pair.
    pub fn signed_transaction_bytes(
        &self,
        node_id: &AccountId,
        chunk_index: usize,
    ) -> Result<Vec<u8>> {
        self.require_frozen("it can be encoded per node")?;
        if chunk_index >= self.chunk_count() || !self.frozen_nodes().contains(node_id) {
            return Err(Error::argument(format!(
                "no entry for node {node_id} chunk {chunk_index}"
            )));
        }
        let body_bytes = to_wire(&self.body_for(node_id, chunk_index)?)?;
        encode_signed(body_bytes, self.signatures.pairs_for(node_id, chunk_index))
    }

    /// A single-entry request frame for `node_id` and `chunk_index`, the unit
    /// nodes accept.
    pub fn request_frame(&self, node_id: &AccountId, chunk_index: usize) -> Result<Vec<u8>> {
        frame(
            FrameKind::SignedTransaction,
            &self.signed_transaction_bytes(node_id, chunk_index)?,
        )
    }

    /// The first pair as a `SignedTransaction` frame. Drafts use their
    /// node-less body.
    pub fn first_signed_frame(&self) -> Result<Vec<u8>> {
        let signed = if self.frozen {
            let node = &self.frozen_nodes()[0];
            self.signed_transaction_bytes(node, 0)?
        } else {
            encode_signed(to_wire(&self.draft_body()?)?, Vec::new())?
        };
        frame(FrameKind::SignedTransaction, &signed)
    }

    /// Encodes the whole transaction as a `TransactionList` frame.
    ///
    /// Drafts produce one node-less entry. Frozen transactions produce one
    /// entry per (node, chunk), node-major, each with only its own signatures.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let entries = if self.frozen {
            let mut entries = Vec::with_capacity(self.frozen_nodes().len() * self.chunk_count());
            for node_id in self.frozen_nodes() {
                for chunk_index in 0..self.chunk_count() {
                    entries.push(self.signed_transaction_bytes(node_id, chunk_index)?);
                }
            }
            entries
        } else {
            vec![encode_signed(to_wire(&self.draft_body()?)?, Vec::new())?]
        };
        encode_transaction_list(entries)
    }

    /// SHA-384 of the first entry's signed bytes.
    pub fn transaction_hash(&self) -> Result<[u8; 48]> {
        self.require_frozen("its hash can be computed")?;
        let node = &self.frozen_nodes()[0];
        Ok(sha384(&self.signed_transaction_bytes(node, 0)?))
    }

    /// Wraps the body data for inclusion in a schedule.
    pub fn schedule(&self) -> Result<ScheduledBody> {
        if !self.data.is_schedulable() {
            return Err(Error::state(format!("{} cannot be scheduled", D::NAME)));
        }
        Ok(ScheduledBody {
            transaction_fee: self.max_transaction_fee(),
            memo: self.memo.clone(),
            data: self.draft_body()?.data,
        })
    }

    /// Validates every embedded entity id against `ledger`.
    pub fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.node_account_ids.validate_checksums(ledger)?;
        self.transaction_id.validate_checksums(ledger)?;
        self.data.validate_checksums(ledger)
    }

    /// Deterministic rendering of the logical transaction. Checksums and
    /// local-only settings are left out, so a decoded copy renders the same.
    pub fn to_canonical_string(&self) -> String {
        let mut out = format!(
            "{} {{ state: {:?}, node_account_ids: {:?}, transaction_id: {:?}, \
             max_transaction_fee: {}, valid_duration_secs: {}, memo: {:?}, data: {}, signatures: [",
            D::NAME,
            self.state(),
            self.node_account_ids,
            self.transaction_id,
            self.max_transaction_fee(),
            self.valid_duration.as_secs(),
            self.memo,
            self.data.canonical_fields(),
        );
        for (i, (node, chunk, key, sig)) in self.signatures.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{node}/{chunk}/{key}={}", hex::encode(sig));
        }
        out.push_str("] }");
        out
    }

    // -- decoding -----------------------------------------------------------

    /// Rebuilds a transaction from decoded wire entries.
    ///
    /// Entries without a node id are a draft and must come alone. Otherwise
    /// they must form a complete node x chunk grid whose per-chunk contents
    /// agree across nodes.
    pub(crate) fn from_entries(entries: Vec<DecodedEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Err(Error::decoding("no transaction entries"));
        };

        let mut tx = Self::new();
        tx.max_transaction_fee = Some(first.body.transaction_fee);
        tx.valid_duration = Duration::from_secs(first.body.valid_duration_secs);
        tx.memo = first.body.memo.clone();

        if entries.iter().any(|e| e.body.node_account_id.is_none()) {
            if entries.len() != 1 {
                return Err(Error::decoding(
                    "entries without a node account id must be encoded alone",
                ));
            }
            let entry = entries.into_iter().next().ok_or_else(|| Error::decoding("no entries"))?;
            if !entry.signatures.is_empty() {
                return Err(Error::decoding("signatures on an entry without a node account id"));
            }
            tx.transaction_id = entry.body.transaction_id;
            tx.data = D::from_body_data(vec![entry.body.data])?;
            return Ok(tx);
        }

        // Distinct chunk ids and node ids, in first-seen order.
        let mut chunk_ids: Vec<TransactionId> = Vec::new();
        let mut node_ids: Vec<AccountId> = Vec::new();
        for entry in &entries {
            let id = entry.body.transaction_id.as_ref().ok_or_else(|| {
                Error::decoding("entry addressed to a node has no transaction id")
            })?;
            if !chunk_ids.contains(id) {
                chunk_ids.push(id.clone());
            }
            if let Some(node) = &entry.body.node_account_id {
                if !node_ids.contains(node) {
                    node_ids.push(node.clone());
                }
            }
        }
        for (index, id) in chunk_ids.iter().enumerate() {
            if *id != chunk_ids[0].for_chunk(index) {
                return Err(Error::decoding(format!(
                    "chunk {index} has transaction id {id}, expected {}",
                    chunk_ids[0].for_chunk(index)
                )));
            }
        }

        let mut grid: BTreeMap<(usize, usize), DecodedEntry> = BTreeMap::new();
        for entry in entries {
            let node_index = entry
                .body
                .node_account_id
                .as_ref()
                .and_then(|n| node_ids.iter().position(|x| x == n))
                .ok_or_else(|| Error::decoding("entry node is missing"))?;
            let chunk_index = entry
                .body
                .transaction_id
                .as_ref()
                .and_then(|id| chunk_ids.iter().position(|x| x == id))
                .ok_or_else(|| Error::decoding("entry transaction id is missing"))?;
            if grid.insert((node_index, chunk_index), entry).is_some() {
                return Err(Error::decoding(format!(
                    "duplicate entry for node {} chunk {chunk_index}",
                    node_ids[node_index]
                )));
            }
        }
        if grid.len() != node_ids.len() * chunk_ids.len() {
            return Err(Error::decoding(format!(
                "incomplete transaction list: {} entries for {} nodes x {} chunks",
                grid.len(),
                node_ids.len(),
                chunk_ids.len()
            )));
        }

        let mut chunk_data = Vec::with_capacity(chunk_ids.len());
        for chunk_index in 0..chunk_ids.len() {
            let reference = &grid[&(0, chunk_index)].body;
            for node_index in 1..node_ids.len() {
                let other = &grid[&(node_index, chunk_index)].body;
                if other.data != reference.data
                    || other.transaction_fee != reference.transaction_fee
                    || other.valid_duration_secs != reference.valid_duration_secs
                    || other.memo != reference.memo
                {
                    return Err(Error::decoding(format!(
                        "chunk {chunk_index} differs between nodes {} and {}",
                        node_ids[0], node_ids[node_index]
                    )));
                }
            }
            chunk_data.push(reference.data.clone());
        }

        tx.data = D::from_body_data(chunk_data)?;
        let ranges = match tx.data.chunk_plan() {
            Some(plan) => plan.ranges()?,
            None => vec![ChunkRange::whole(0)],
        };
        if ranges.len() != chunk_ids.len() {
            return Err(Error::decoding(format!(
                "{} chunks decoded but the payload plans {}",
                chunk_ids.len(),
                ranges.len()
            )));
        }

        for ((node_index, chunk_index), entry) in grid {
            for pair in entry.signatures {
                tx.signatures.insert(
                    node_ids[node_index].clone(),
                    chunk_index,
                    pair.public_key,
                    pair.signature,
                );
            }
        }

        tx.transaction_id = Some(chunk_ids[0].clone());
        tx.node_account_ids = Some(node_ids);
        tx.chunk_ids = chunk_ids;
        tx.chunk_ranges = ranges;
        tx.frozen = true;
        Ok(tx)
    }

    /// Decodes bytes that must hold a transaction of kind `D`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_entries(codec::decode_entries(bytes)?)
    }
}

impl<D: TransactionData> fmt::Debug for Transaction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}
