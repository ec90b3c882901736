//! Chain service: the ledger over HTTP.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use trustchain::{ChainReport, Health, Ledger, LedgerEntry};

use crate::error::{required, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    pub canonical: Option<String>,
    pub signature: Option<String>,
    pub public_key_pem: Option<String>,
}

/// Build the chain router around a ledger handle.
pub fn router(ledger: Ledger) -> Router {
    Router::new()
        .route("/chain", get(chain))
        .route("/head", get(head))
        .route("/health", get(health))
        .route("/append", post(append))
        .route("/verify", post(verify))
        .route("/reload", post(reload))
        .layer(TraceLayer::new_for_http())
        .with_state(ledger)
}

async fn chain(State(ledger): State<Ledger>) -> Json<Vec<LedgerEntry>> {
    Json(ledger.all().as_ref().clone())
}

async fn head(State(ledger): State<Ledger>) -> Json<Option<LedgerEntry>> {
    Json(ledger.head())
}

async fn health(State(ledger): State<Ledger>) -> Json<Health> {
    Json(ledger.health())
}

async fn append(
    State(ledger): State<Ledger>,
    body: Result<Json<AppendRequest>, JsonRejection>,
) -> ApiResult<Json<LedgerEntry>> {
    let Json(request) = body?;
    let canonical = required(request.canonical, "canonical")?;
    let signature = required(request.signature, "signature")?;
    let public_key_pem = required(request.public_key_pem, "publicKeyPem")?;

    let appended = ledger.append(canonical, &signature, &public_key_pem).await?;
    Ok(Json(appended.entry))
}

async fn verify(State(ledger): State<Ledger>) -> Json<ChainReport> {
    Json(ledger.verify())
}

async fn reload(State(ledger): State<Ledger>) -> ApiResult<Json<serde_json::Value>> {
    let reloaded = ledger.reload().await?;
    Ok(Json(json!({ "status": "RELOADED", "length": reloaded.length })))
}
