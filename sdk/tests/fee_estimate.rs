//! Fee estimate queries against a local mirror stand-in.
//!
//! The mock is a real axum server on an ephemeral port, so these tests go
//! through reqwest, the URL rules, and the retry loop exactly as production
//! calls do. Retries really sleep (500 ms each); time is not paused because
//! reqwest's timeouts run on the same clock.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use serde_json::json;

use ledger_sdk::fees::{FeeEstimateMode, FeeEstimateQuery};
use ledger_sdk::id::AccountId;
use ledger_sdk::transaction::TransferTransaction;
use ledger_sdk::{Client, Error};

// ---------------------------------------------------------------------------
// Mock Mirror
// ---------------------------------------------------------------------------

struct MockMirror {
    /// Replies in order; the last one repeats.
    replies: Vec<(u16, String)>,
    requests: AtomicUsize,
    modes: Mutex<Vec<String>>,
}

async fn fees(
    State(mock): State<Arc<MockMirror>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> (StatusCode, String) {
    let n = mock.requests.fetch_add(1, Ordering::SeqCst);

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != "application/protobuf" {
        return (StatusCode::BAD_REQUEST, format!("bad content type `{content_type}`"));
    }
    let Some(mode) = params.get("mode") else {
        return (StatusCode::BAD_REQUEST, "missing mode".into());
    };
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty body".into());
    }
    mock.modes.lock().push(mode.clone());

    let (status, body) = mock
        .replies
        .get(n)
        .or_else(|| mock.replies.last())
        .cloned()
        .unwrap_or((500, String::new()));
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body,
    )
}

async fn start_mirror(replies: Vec<(u16, String)>) -> (SocketAddr, Arc<MockMirror>) {
    let mock = Arc::new(MockMirror {
        replies,
        requests: AtomicUsize::new(0),
        modes: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/api/v1/network/fees", post(fees))
        .with_state(Arc::clone(&mock));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (address, mock)
}

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A consistent estimate: the network fee is `multiplier` times the node fee.
fn estimate(mode: &str, multiplier: u64, node: u64, service: u64) -> String {
    json!({
        "mode": mode,
        "network": { "multiplier": multiplier, "subtotal": multiplier * node },
        "node": { "base": node, "extras": [] },
        "service": { "base": service, "extras": [] },
        "notes": [],
        "total": multiplier * node + node + service,
    })
    .to_string()
}

fn client_for(address: SocketAddr) -> Client {
    Client::builder()
        .mirror_network(vec![address.to_string()])
        .request_timeout(Duration::from_secs(30))
        .build()
        .unwrap()
}

fn query(mode: FeeEstimateMode) -> FeeEstimateQuery {
    let mut tx = TransferTransaction::new();
    tx.add_hbar_transfer(AccountId::from_num(2), -1)
        .unwrap()
        .add_hbar_transfer(AccountId::from_num(3), 1)
        .unwrap();
    let mut query = FeeEstimateQuery::new();
    query.set_transaction(&tx).unwrap().set_mode(mode);
    query
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn service_unavailable_is_retried() {
    let (address, mock) = start_mirror(vec![
        (503, "unavailable".into()),
        (200, estimate("STATE", 2, 6, 8)),
    ])
    .await;

    let response = query(FeeEstimateMode::State)
        .execute(&client_for(address))
        .await
        .unwrap();

    assert_eq!(response.total, 26);
    assert_eq!(response.mode, FeeEstimateMode::State);
    assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
    assert_eq!(*mock.modes.lock(), vec!["STATE", "STATE"]);
}

#[tokio::test]
async fn gateway_timeout_is_retried() {
    let (address, mock) = start_mirror(vec![
        (504, "gateway timeout".into()),
        (200, estimate("STATE", 4, 8, 20)),
    ])
    .await;

    let response = query(FeeEstimateMode::State)
        .execute(&client_for(address))
        .await
        .unwrap();

    assert_eq!(response.total, 60);
    assert_eq!(response.network.subtotal, 32);
    assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn intrinsic_mode_succeeds_first_time() {
    let (address, mock) = start_mirror(vec![(200, estimate("INTRINSIC", 3, 10, 20))]).await;

    let response = query(FeeEstimateMode::Intrinsic)
        .execute(&client_for(address))
        .await
        .unwrap();

    assert_eq!(response.total, 60);
    assert_eq!(response.mode, FeeEstimateMode::Intrinsic);
    assert_eq!(mock.requests.load(Ordering::SeqCst), 1);
    assert_eq!(*mock.modes.lock(), vec!["INTRINSIC"]);
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let (address, mock) = start_mirror(vec![(400, "malformed transaction".into())]).await;

    let err = query(FeeEstimateMode::State)
        .execute(&client_for(address))
        .await
        .unwrap_err();

    match err {
        Error::HttpRejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "malformed transaction");
        }
        other => panic!("expected HttpRejected, got {other:?}"),
    }
    assert_eq!(mock.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inconsistent_totals_are_retried() {
    let mut wrong: serde_json::Value =
        serde_json::from_str(&estimate("STATE", 2, 6, 8)).unwrap();
    wrong["total"] = json!(25);
    let (address, mock) = start_mirror(vec![
        (200, wrong.to_string()),
        (200, estimate("STATE", 2, 6, 8)),
    ])
    .await;

    let response = query(FeeEstimateMode::State)
        .execute(&client_for(address))
        .await
        .unwrap();

    assert_eq!(response.total, 26);
    assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn attempts_run_out_with_the_last_status() {
    let (address, mock) = start_mirror(vec![(503, "still down".into())]).await;

    let mut query = query(FeeEstimateMode::State);
    query.set_max_attempts(2).unwrap();
    let err = query.execute(&client_for(address)).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }), "got {err:?}");
    assert_eq!(mock.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_transaction_is_a_state_error() {
    let client = Client::builder()
        .mirror_network(vec!["127.0.0.1:9".into()])
        .build()
        .unwrap();
    let err = FeeEstimateQuery::new().execute(&client).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "transaction must be set before executing fee estimate"
    );
}
