//! Submission tests against a scripted node transport.
//!
//! Each node address gets a fixed list of replies. The last reply repeats
//! once the list runs out. Time is paused so backoff waits cost nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use ledger_sdk::crypto::PrivateKey;
use ledger_sdk::execution::{
    encode_response, read_message, write_message, NodeResponse, NodeTransport, ResponseStatus,
};
use ledger_sdk::id::{AccountId, FileId};
use ledger_sdk::transaction::{
    AnyTransaction, FileAppendTransaction, TransactionState, TransferTransaction,
};
use ledger_sdk::{Client, Error, Result};

// ---------------------------------------------------------------------------
// Scripted Transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Reply {
    Status(ResponseStatus),
    /// Connection refused.
    Down,
    /// Never answers.
    Stall,
}

#[derive(Default)]
struct ScriptedTransport {
    script: HashMap<String, Vec<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: &[(&str, &[Reply])]) -> Arc<Self> {
        Arc::new(Self {
            script: script
                .iter()
                .map(|(address, replies)| (address.to_string(), replies.to_vec()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn calls_to(&self, address: &str) -> usize {
        self.calls.lock().iter().filter(|a| *a == address).count()
    }
}

#[async_trait]
impl NodeTransport for ScriptedTransport {
    async fn submit(&self, address: &str, request: &[u8]) -> Result<NodeResponse> {
        assert!(!request.is_empty());
        let seen = {
            let mut calls = self.calls.lock();
            let seen = calls.iter().filter(|a| *a == address).count();
            calls.push(address.to_string());
            seen
        };
        let replies = self.script.get(address).map(Vec::as_slice).unwrap_or(&[]);
        let reply = replies
            .get(seen)
            .or_else(|| replies.last())
            .copied()
            .unwrap_or(Reply::Status(ResponseStatus::Ok));
        match reply {
            Reply::Status(status) => Ok(NodeResponse::new(status)),
            Reply::Down => Err(Error::transport(address, "connection refused")),
            Reply::Stall => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(Error::transport(address, "stalled"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const NODE_A: &str = "node-a:50211";
const NODE_B: &str = "node-b:50211";
const NODE_C: &str = "node-c:50211";

fn network(addresses: &[&str]) -> BTreeMap<String, AccountId> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, address)| (address.to_string(), AccountId::from_num(3 + i as u64)))
        .collect()
}

fn client(addresses: &[&str], transport: Arc<ScriptedTransport>) -> Client {
    Client::builder()
        .network(network(addresses))
        .operator(AccountId::from_num(2), PrivateKey::from_seed(&[2; 32]))
        .node_transport(transport)
        .build()
        .unwrap()
}

fn transfer() -> TransferTransaction {
    let mut tx = TransferTransaction::new();
    tx.add_hbar_transfer(AccountId::from_num(2), -100)
        .unwrap()
        .add_hbar_transfer(AccountId::from_num(1001), 100)
        .unwrap();
    tx
}

// ---------------------------------------------------------------------------
// Sequential Execution
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn busy_then_ok_takes_two_attempts() {
    let transport = ScriptedTransport::new(&[(
        NODE_A,
        &[Reply::Status(ResponseStatus::Busy), Reply::Status(ResponseStatus::Ok)],
    )]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let mut tx = transfer();
    let started = tokio::time::Instant::now();
    let response = tx.execute(&client).await.unwrap();

    assert_eq!(transport.calls().len(), 2);
    assert_eq!(started.elapsed(), Duration::from_millis(250), "one min backoff");
    assert_eq!(response.node_id, AccountId::from_num(3));
    assert_eq!(Some(&response.transaction_id), tx.transaction_id());
    assert_eq!(response.transaction_hash, tx.transaction_hash().unwrap());
    assert_eq!(tx.state(), TransactionState::Signed, "operator signed it");
}

#[tokio::test(start_paused = true)]
async fn fatal_precheck_stops_after_one_attempt() {
    let transport = ScriptedTransport::new(&[(
        NODE_A,
        &[Reply::Status(ResponseStatus::InvalidSignature)],
    )]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let err = transfer().execute(&client).await.unwrap_err();
    assert!(
        matches!(
            err,
            Error::Precheck {
                status: ResponseStatus::InvalidSignature,
                ..
            }
        ),
        "got {err:?}"
    );
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_returns_the_last_precheck() {
    let transport = ScriptedTransport::new(&[(NODE_A, &[Reply::Status(ResponseStatus::Busy)])]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let mut tx = transfer();
    tx.set_max_attempts(3).unwrap();
    let err = tx.execute(&client).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Precheck {
            status: ResponseStatus::Busy,
            ..
        }
    ));
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn dead_node_is_benched_and_another_node_answers() {
    let transport = ScriptedTransport::new(&[(NODE_A, &[Reply::Down])]);
    let client = client(&[NODE_A, NODE_B], Arc::clone(&transport));

    let started = tokio::time::Instant::now();
    let response = transfer().execute(&client).await.unwrap();

    assert_eq!(response.node_id, AccountId::from_num(4));
    assert!(transport.calls_to(NODE_A) <= 1);
    assert_eq!(transport.calls_to(NODE_B), 1);
    assert_eq!(started.elapsed(), Duration::ZERO, "node failover does not wait");
    if transport.calls_to(NODE_A) == 1 {
        let node = client.network().node(&AccountId::from_num(3)).unwrap();
        assert!(!node.is_healthy());
    }
}

#[tokio::test(start_paused = true)]
async fn lone_dead_node_is_retried_after_its_backoff() {
    let transport = ScriptedTransport::new(&[(NODE_A, &[Reply::Down])]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let mut tx = transfer();
    tx.set_max_attempts(3).unwrap();
    let started = tokio::time::Instant::now();
    let err = tx.execute(&client).await.unwrap_err();

    assert!(matches!(err, Error::Transport { .. }), "got {err:?}");
    assert_eq!(transport.calls().len(), 3);
    // Node penalties are 8 s, then 16 s.
    assert_eq!(started.elapsed(), Duration::from_secs(24));
}

#[tokio::test(start_paused = true)]
async fn lone_node_recovers_once_readmitted() {
    let transport = ScriptedTransport::new(&[(
        NODE_A,
        &[Reply::Down, Reply::Status(ResponseStatus::Ok)],
    )]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let started = tokio::time::Instant::now();
    let response = transfer().execute(&client).await.unwrap();

    assert_eq!(response.node_id, AccountId::from_num(3));
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(8));
    assert!(client.network().node(&AccountId::from_num(3)).unwrap().is_healthy());
}

#[tokio::test(start_paused = true)]
async fn chunks_are_submitted_in_order_with_their_own_ids() {
    let transport = ScriptedTransport::new(&[]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let mut tx = FileAppendTransaction::new();
    tx.set_file_id(FileId::from_num(150))
        .unwrap()
        .set_contents(vec![7u8; 5000])
        .unwrap();
    let responses = tx.execute_all(&client).await.unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(responses[0].transaction_id, tx.chunk_transaction_ids()[0]);
    assert_eq!(responses[1].transaction_id, tx.chunk_transaction_ids()[1]);
    assert_ne!(responses[0].transaction_hash, responses[1].transaction_hash);
}

#[tokio::test(start_paused = true)]
async fn bad_checksum_fails_before_anything_is_sent() {
    let transport = ScriptedTransport::new(&[]);
    let client = Client::builder()
        .network(network(&[NODE_A]))
        .operator(AccountId::from_num(2), PrivateKey::from_seed(&[2; 32]))
        .ledger_id(ledger_sdk::LedgerId::Testnet)
        .node_transport(Arc::clone(&transport) as Arc<dyn NodeTransport>)
        .build()
        .unwrap();

    let mut tx = TransferTransaction::new();
    tx.add_hbar_transfer("0.0.123-vfmkw".parse().unwrap(), 1)
        .unwrap();
    let err = tx.execute(&client).await.unwrap_err();
    assert!(matches!(err, Error::BadEntityId { .. }), "got {err:?}");
    assert!(transport.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn execute_without_nodes_fails() {
    let transport = ScriptedTransport::new(&[]);
    let client = client(&[], transport);
    assert!(matches!(
        transfer().execute(&client).await,
        Err(Error::NoNodes)
    ));
}

// ---------------------------------------------------------------------------
// Fan-out & Batches
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn fan_out_first_success_wins() {
    let transport = ScriptedTransport::new(&[
        (NODE_A, &[Reply::Status(ResponseStatus::Busy)]),
        (NODE_B, &[Reply::Down]),
        (NODE_C, &[Reply::Status(ResponseStatus::Ok)]),
    ]);
    let client = client(&[NODE_A, NODE_B, NODE_C], Arc::clone(&transport));

    let response = transfer().execute_fan_out(&client, 3).await.unwrap();
    assert_eq!(response.node_id, AccountId::from_num(5));
}

#[tokio::test(start_paused = true)]
async fn fan_out_reports_every_failure() {
    let transport = ScriptedTransport::new(&[
        (NODE_A, &[Reply::Status(ResponseStatus::Busy)]),
        (NODE_B, &[Reply::Down]),
        (NODE_C, &[Reply::Status(ResponseStatus::InvalidTransaction)]),
    ]);
    let client = client(&[NODE_A, NODE_B, NODE_C], Arc::clone(&transport));

    match transfer().execute_fan_out(&client, 3).await {
        Err(Error::AllNodesFailed(failures)) => {
            assert_eq!(failures.len(), 3);
            let mut nodes: Vec<u64> = failures.iter().map(|f| f.node_account_id.num).collect();
            nodes.sort_unstable();
            assert_eq!(nodes, vec![3, 4, 5]);
        }
        other => panic!("expected AllNodesFailed, got {other:?}"),
    }
    assert_eq!(transport.calls().len(), 3, "one attempt per branch");
}

#[tokio::test(start_paused = true)]
async fn fan_out_reports_the_hash_the_winner_received() {
    let transport = ScriptedTransport::new(&[]);
    let client = client(&[NODE_A], Arc::clone(&transport));

    let mut tx = transfer();
    let response = tx.execute_fan_out(&client, 2).await.unwrap();

    assert_eq!(response.node_id, AccountId::from_num(3));
    assert_eq!(response.transaction_hash, tx.transaction_hash().unwrap());
}

#[tokio::test(start_paused = true)]
async fn fan_out_deadline_reports_measured_time() {
    let transport = ScriptedTransport::new(&[
        (NODE_A, &[Reply::Stall]),
        (NODE_B, &[Reply::Stall]),
    ]);
    let client = client(&[NODE_A, NODE_B], Arc::clone(&transport));

    let mut tx = transfer();
    tx.set_request_timeout(Duration::from_secs(5));
    let started = tokio::time::Instant::now();
    let err = tx.execute_fan_out(&client, 2).await.unwrap_err();

    match err {
        Error::TimedOut {
            elapsed_ms,
            timeout_ms,
        } => {
            assert_eq!(timeout_ms, 5_000);
            assert_eq!(elapsed_ms, started.elapsed().as_millis() as u64);
            assert!(elapsed_ms >= timeout_ms);
        }
        other => panic!("expected TimedOut, got {other:?}"),
    }
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn batch_runs_every_transaction() {
    let transport = ScriptedTransport::new(&[]);
    let client = client(&[NODE_A, NODE_B], Arc::clone(&transport));

    let batch: Vec<AnyTransaction> = (0..5).map(|_| transfer().into()).collect();
    let results = client.execute_batch(batch).await;

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(transport.calls().len(), 5);
}

// ---------------------------------------------------------------------------
// TCP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tcp_transport_speaks_length_prefixed_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_message(&mut stream).await.unwrap();
        let reply = encode_response(&NodeResponse::new(ResponseStatus::Ok)).unwrap();
        write_message(&mut stream, &reply).await.unwrap();
        request
    });

    let client = Client::builder()
        .network(BTreeMap::from([(address, AccountId::from_num(3))]))
        .operator(AccountId::from_num(2), PrivateKey::from_seed(&[2; 32]))
        .build()
        .unwrap();
    let mut tx = transfer();
    let response = tx.execute(&client).await.unwrap();
    assert_eq!(response.node_id, AccountId::from_num(3));

    let received = AnyTransaction::from_bytes(&server.await.unwrap()).unwrap();
    assert_eq!(received.kind(), "TransferTransaction");
    assert_eq!(received.state(), TransactionState::Signed);
}
