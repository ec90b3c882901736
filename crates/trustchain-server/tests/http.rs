//! HTTP surface tests, driving the routers in-process.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use trustchain::store::file::SNAPSHOT_FILE;
use trustchain::store::{FailPoint, MemoryStore};
use trustchain::{KeyCustodian, Ledger, LedgerConfig, LedgerEntry};
use trustchain_server::{chain, signer};

struct Harness {
    _dir: tempfile::TempDir,
    config: LedgerConfig,
    signer: Router,
    chain: Router,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let custodian = KeyCustodian::open_with(dir.path().join("keys.json"), false).unwrap();
    let config = LedgerConfig {
        data_dir: dir.path().join("data"),
        fsync: false,
        command_buffer: 8,
    };
    let ledger = Ledger::open(&config).await.unwrap();
    Harness {
        signer: signer::router(Arc::new(custodian)),
        chain: chain::router(ledger),
        config,
        _dir: dir,
    }
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn sign_and_append(h: &Harness, payload: Value) -> (StatusCode, Value) {
    let (_, signed) = call(&h.signer, "POST", "/sign", Some(json!({ "payload": payload }))).await;
    let (_, pubkey) = call(&h.signer, "GET", "/pubkey", None).await;
    call(
        &h.chain,
        "POST",
        "/append",
        Some(json!({
            "canonical": signed["canonical"],
            "signature": signed["signature"],
            "publicKeyPem": pubkey["publicKeyPem"],
        })),
    )
    .await
}

#[tokio::test]
async fn test_sign_shape() {
    let h = harness().await;
    let (status, body) = call(&h.signer, "POST", "/sign", Some(json!({"payload": {"b": [1, 2], "a": null}}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canonical"], r#"{"a":null,"b":[1,2]}"#);
    assert_eq!(body["alg"], "ed25519");
    assert_eq!(body["hash_sha256"].as_str().unwrap().len(), 64);
    assert!(body["signature"].is_string());
}

#[tokio::test]
async fn test_signer_verify_defaults_to_active_key() {
    let h = harness().await;
    let (_, signed) = call(&h.signer, "POST", "/sign", Some(json!({"payload": {"x": 1}}))).await;

    let (status, body) = call(
        &h.signer,
        "POST",
        "/verify",
        Some(json!({ "canonical": signed["canonical"], "signature": signed["signature"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let (_, body) = call(
        &h.signer,
        "POST",
        "/verify",
        Some(json!({ "canonical": r#"{"x":2}"#, "signature": signed["signature"] })),
    )
    .await;
    assert_eq!(body["verified"], false);

    let (_, body) = call(
        &h.signer,
        "POST",
        "/verify",
        Some(json!({ "canonical": "{}", "signature": "@@", "publicKeyPem": "nope" })),
    )
    .await;
    assert_eq!(body["verified"], false);
}

#[tokio::test]
async fn test_rotate_and_health() {
    let h = harness().await;
    let (_, before) = call(&h.signer, "GET", "/health", None).await;
    assert_eq!(before["status"], "OK");

    let (status, rotated) = call(&h.signer, "POST", "/rotate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rotated["rotated"], true);
    assert_ne!(rotated["newKeyId"], before["activeKeyId"]);

    let (_, after) = call(&h.signer, "GET", "/health", None).await;
    assert_eq!(after["activeKeyId"], rotated["newKeyId"]);

    let (_, pubkey) = call(&h.signer, "GET", "/pubkey", None).await;
    assert_eq!(pubkey["publicKeyPem"], rotated["publicKeyPem"]);

    let (_, keys) = call(&h.signer, "GET", "/keys", None).await;
    let keys = keys.as_array().unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0]["active"], false);
    assert_eq!(keys[1]["active"], true);
}

#[tokio::test]
async fn test_missing_fields() {
    let h = harness().await;

    let (status, body) = call(&h.signer, "POST", "/sign", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "payload_required");

    let (status, body) = call(&h.signer, "POST", "/verify", Some(json!({"canonical": "{}"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "signature_required");

    let (status, body) = call(
        &h.chain,
        "POST",
        "/append",
        Some(json!({"canonical": "{}", "signature": "AA=="})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "publicKeyPem_required");

    let (status, body) = call(&h.chain, "POST", "/append", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "canonical_required");
}

#[tokio::test]
async fn test_append_rejects_bad_signature() {
    let h = harness().await;
    let (_, signed) = call(&h.signer, "POST", "/sign", Some(json!({"payload": {"a": 1}}))).await;
    let (_, pubkey) = call(&h.signer, "GET", "/pubkey", None).await;

    let (status, body) = call(
        &h.chain,
        "POST",
        "/append",
        Some(json!({
            "canonical": r#"{"a":2}"#,
            "signature": signed["signature"],
            "publicKeyPem": pubkey["publicKeyPem"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "signature_invalid");

    let (_, chain) = call(&h.chain, "GET", "/chain", None).await;
    assert_eq!(chain, json!([]));
    let (_, head) = call(&h.chain, "GET", "/head", None).await;
    assert_eq!(head, Value::Null);
}

#[tokio::test]
async fn test_end_to_end() {
    let h = harness().await;

    let (status, first) = sign_and_append(&h, json!({"a": 1})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["seq"], 0);
    assert_eq!(first["prevHash"], Value::Null);

    let (_, again) = sign_and_append(&h, json!({"a": 1})).await;
    assert_eq!(again, first);
    let (_, chain) = call(&h.chain, "GET", "/chain", None).await;
    assert_eq!(chain.as_array().unwrap().len(), 1);

    let (_, second) = sign_and_append(&h, json!({"a": 2})).await;
    assert_eq!(second["seq"], 1);
    assert_eq!(second["prevHash"], first["contentHash"]);

    let (_, head) = call(&h.chain, "GET", "/head", None).await;
    assert_eq!(head, second);

    let (_, health) = call(&h.chain, "GET", "/health", None).await;
    assert_eq!(health, json!({"status": "OK", "length": 2}));

    // Corrupt entry 0 on disk, reload, verify
    let path = h.config.data_dir.join(SNAPSHOT_FILE);
    let mut entries: Vec<LedgerEntry> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    entries[0].canonical = r#"{"a":3}"#.into();
    std::fs::write(&path, serde_json::to_vec(&entries).unwrap()).unwrap();

    let (status, reloaded) = call(&h.chain, "POST", "/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reloaded, json!({"status": "RELOADED", "length": 2}));

    let (_, report) = call(&h.chain, "POST", "/verify", Some(json!({}))).await;
    assert_eq!(report["ok"], false);
    assert_eq!(report["length"], 2);
    let issues = report["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["kind"], "CONTENT_HASH_MISMATCH");
    assert_eq!(issues[0]["seq"], 0);

    let (_, health) = call(&h.chain, "GET", "/health", None).await;
    assert_eq!(health["status"], "DEGRADED");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let h = harness().await;
    let request = Request::builder()
        .method("POST")
        .uri("/append")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = h.chain.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"error": "invalid_json"}));
}

#[tokio::test]
async fn test_append_persist_failure() {
    let h = harness().await;
    let store = Arc::new(MemoryStore::new());
    let chain = chain::router(Ledger::with_store(store.clone(), 8).await.unwrap());

    let (_, signed) = call(&h.signer, "POST", "/sign", Some(json!({"payload": {"a": 1}}))).await;
    let (_, pubkey) = call(&h.signer, "GET", "/pubkey", None).await;
    let request = json!({
        "canonical": signed["canonical"],
        "signature": signed["signature"],
        "publicKeyPem": pubkey["publicKeyPem"],
    });

    store.fail_next(FailPoint::WriteSnapshot);
    let (status, body) = call(&chain, "POST", "/append", Some(request.clone())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "persist_failed"}));

    let (_, entries) = call(&chain, "GET", "/chain", None).await;
    assert_eq!(entries, json!([]));
    assert_eq!(store.log_len(), 0);

    let (status, entry) = call(&chain, "POST", "/append", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["seq"], 0);
    assert_eq!(store.log_len(), 1);
}
