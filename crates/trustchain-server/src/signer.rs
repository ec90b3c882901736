//! Signer service: key custody over HTTP.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use trustchain::core::ALGORITHM;
use trustchain::{KeyCustodian, KeyInfo};

use crate::error::{required, ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub canonical: String,
    #[serde(rename = "hash_sha256")]
    pub hash_sha256: String,
    pub signature: String,
    pub alg: String,
    pub key_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub canonical: Option<String>,
    pub signature: Option<String>,
    pub public_key_pem: Option<String>,
}

/// Build the signer router around a shared custodian.
pub fn router(custodian: Arc<KeyCustodian>) -> Router {
    Router::new()
        .route("/pubkey", get(pubkey))
        .route("/keys", get(keys))
        .route("/sign", post(sign))
        .route("/verify", post(verify))
        .route("/rotate", post(rotate))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(custodian)
}

async fn pubkey(State(custodian): State<Arc<KeyCustodian>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "publicKeyPem": custodian.active_public_key_pem() }))
}

async fn keys(State(custodian): State<Arc<KeyCustodian>>) -> Json<Vec<KeyInfo>> {
    Json(custodian.keys())
}

async fn sign(
    State(custodian): State<Arc<KeyCustodian>>,
    body: Result<Json<SignRequest>, JsonRejection>,
) -> ApiResult<Json<SignResponse>> {
    let Json(request) = body?;
    let payload = required(request.payload, "payload")?;

    let signed = custodian.sign_json(&payload);
    Ok(Json(SignResponse {
        canonical: signed.canonical,
        hash_sha256: signed.hash.to_hex(),
        signature: signed.signature.to_base64(),
        alg: ALGORITHM.to_string(),
        key_id: signed.key_id,
    }))
}

async fn verify(
    State(custodian): State<Arc<KeyCustodian>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(request) = body?;
    let canonical = required(request.canonical, "canonical")?;
    let signature = required(request.signature, "signature")?;

    let verified = match request.public_key_pem {
        Some(pem) => custodian.verify(&canonical, &signature, &pem),
        None => custodian.verify_with_active(&canonical, &signature),
    };
    Ok(Json(serde_json::json!({ "verified": verified })))
}

async fn rotate(State(custodian): State<Arc<KeyCustodian>>) -> ApiResult<Json<serde_json::Value>> {
    let rotated = tokio::task::spawn_blocking(move || custodian.rotate())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    info!(key_id = %rotated.id, "key rotated via api");
    Ok(Json(serde_json::json!({
        "rotated": true,
        "newKeyId": rotated.id,
        "publicKeyPem": rotated.public_key_pem,
    })))
}

async fn health(State(custodian): State<Arc<KeyCustodian>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "activeKeyId": custodian.active_key_id(),
    }))
}
