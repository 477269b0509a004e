use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use questline_client::{
    Funder, FriendbotFunder, HorizonClient, HorizonConfig, LedgerClient, LedgerError,
    TransactionStatus,
};
use questline_common::{Hash256, ManualClock, NetworkId};
use questline_crypto::SecretKey;
use questline_tx::{
    Account, Asset, Operation, SignedTransaction, SigningCoordinator, TransactionBuilder,
    DEFAULT_TIMEOUT,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpListener;

fn source_key() -> SecretKey {
    SecretKey::from_seed(&[7u8; 32])
}

fn signed_payment() -> SignedTransaction {
    let clock = Arc::new(ManualClock::new(1_000));
    let key = source_key();
    let account = Account::loaded(key.public_key(), 41, 1_000);
    let unsigned = TransactionBuilder::new(clock)
        .build(
            &account,
            vec![Operation::payment(
                SecretKey::from_seed(&[8u8; 32]).public_key(),
                Asset::Native,
                10_000_000,
            )],
            100,
            DEFAULT_TIMEOUT,
        )
        .unwrap();
    SigningCoordinator::new(NetworkId::testnet())
        .sign(unsigned, &[&key])
        .unwrap()
}

async fn account_handler(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id != source_key().public_key().to_string() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"type": "not_found", "status": 404})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": id,
            "sequence": "41",
            "thresholds": {"low_threshold": 0, "med_threshold": 0, "high_threshold": 0},
            "flags": {"auth_required": false, "auth_revocable": false,
                      "auth_immutable": false, "auth_clawback_enabled": false},
            "balances": [{"balance": "10000.0000000", "asset_type": "native"}],
            "signers": [{"key": id, "weight": 1, "type": "ed25519_public_key"}]
        })),
    )
}

async fn submit_handler(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let tx = form.get("tx").cloned().unwrap_or_default();
    if tx.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"status": 400})));
    }
    let expected = signed_payment();
    if tx == expected.to_base64().unwrap() {
        return (
            StatusCode::OK,
            Json(json!({"hash": expected.hash().to_hex(), "ledger": 1234, "successful": true})),
        );
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "type": "transaction_failed",
            "status": 400,
            "extras": {
                "envelope_xdr": tx,
                "result_codes": {"transaction": "tx_bad_seq"}
            }
        })),
    )
}

async fn status_handler(Path(hash): Path<String>) -> (StatusCode, Json<Value>) {
    if hash == signed_payment().hash().to_hex() {
        return (
            StatusCode::OK,
            Json(json!({"hash": hash, "ledger": 1234, "successful": true})),
        );
    }
    (StatusCode::NOT_FOUND, Json(json!({"status": 404})))
}

async fn friendbot_handler(Query(q): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if q.get("addr") == Some(&source_key().public_key().to_string()) {
        (StatusCode::BAD_REQUEST, Json(json!({"detail": "account already funded"})))
    } else {
        (StatusCode::OK, Json(json!({"successful": true})))
    }
}

async fn timeout_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::GATEWAY_TIMEOUT, Json(json!({"type": "timeout", "status": 504})))
}

/// Starts a mock Horizon; `None` if binding is not permitted here.
async fn start_server(app: Router) -> Option<String> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping test: tcp bind not permitted in this environment");
            return None;
        }
        Err(err) => panic!("bind: {err}"),
    };
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    Some(format!("http://{}", addr))
}

fn horizon_app() -> Router {
    Router::new()
        .route("/accounts/:id", get(account_handler))
        .route("/transactions", post(submit_handler))
        .route("/transactions/:hash", get(status_handler))
        .route("/friendbot", get(friendbot_handler))
}

fn client(base: &str) -> HorizonClient {
    HorizonClient::new(
        HorizonConfig::new(base).with_timeout(Duration::from_secs(5)),
        Arc::new(ManualClock::new(5_000)),
    )
    .expect("client")
}

#[tokio::test]
async fn test_load_account_and_not_found() {
    let Some(base) = start_server(horizon_app()).await else {
        return;
    };
    let client = client(&base);

    let account = client
        .load_account(&source_key().public_key())
        .await
        .expect("load");
    assert_eq!(account.sequence(), 41);
    assert_eq!(account.loaded_at(), Some(5_000));
    assert_eq!(account.native_balance(), 100_000_000_000);

    let missing = SecretKey::from_seed(&[99u8; 32]).public_key();
    assert!(matches!(
        client.load_account(&missing).await,
        Err(LedgerError::AccountNotFound(_))
    ));
}

#[tokio::test]
async fn test_submit_accepted_and_rejected() {
    let Some(base) = start_server(horizon_app()).await else {
        return;
    };
    let client = client(&base);

    let signed = signed_payment();
    let response = client.submit(&signed).await.expect("submit");
    assert_eq!(response.hash, signed.hash());
    assert_eq!(response.ledger, 1234);

    // Same payment signed by a different key: the mock rejects it.
    let other = SigningCoordinator::new(NetworkId::testnet())
        .cosign(signed, &[&SecretKey::from_seed(&[9u8; 32])])
        .unwrap();
    match client.submit(&other).await {
        Err(LedgerError::SequenceConflict(diagnostics)) => {
            assert_eq!(diagnostics.transaction.as_deref(), Some("tx_bad_seq"));
            assert!(diagnostics.extras.get("envelope_xdr").is_some());
        }
        other => panic!("expected SequenceConflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transaction_status() {
    let Some(base) = start_server(horizon_app()).await else {
        return;
    };
    let client = client(&base);

    match client.transaction_status(&signed_payment().hash()).await {
        Ok(TransactionStatus::Success { ledger }) => assert_eq!(ledger, 1234),
        other => panic!("expected success, got {:?}", other),
    }
    assert!(matches!(
        client.transaction_status(&Hash256::hash(b"unknown")).await,
        Ok(TransactionStatus::NotFound)
    ));
}

#[tokio::test]
async fn test_gateway_timeout_is_network_error() {
    let app = Router::new().route("/transactions", post(timeout_handler));
    let Some(base) = start_server(app).await else {
        return;
    };
    let err = client(&base).submit(&signed_payment()).await.unwrap_err();
    assert!(err.is_retryable(), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = HorizonClient::new(
        HorizonConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_secs(2)),
        Arc::new(ManualClock::new(0)),
    )
    .unwrap();
    let err = client
        .load_account(&source_key().public_key())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_friendbot_fund_all_reports_each_account() {
    let Some(base) = start_server(horizon_app()).await else {
        return;
    };
    let funder =
        FriendbotFunder::new(format!("{}/friendbot", base), Duration::from_secs(5)).unwrap();
    let fresh = SecretKey::from_seed(&[50u8; 32]).public_key();
    let existing = source_key().public_key();

    let results = funder.fund_all(&[fresh, existing]).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, fresh);
    assert!(results[0].1.is_ok());
    assert_eq!(results[1].0, existing);
    assert!(results[1].1.is_err());
}
