//! HTTP handlers for the donation-recording workflow and the transparency
//! and audit surface.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use donation_core::{Block, Fault, LedgerError, Receipt, Transaction};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Deserialize)]
pub struct DonationInput {
    pub donor: String,
    pub charity: String,
    pub amount: u64,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct Head {
    pub height: u64,
    pub hash: String,
}

#[derive(Serialize)]
pub struct Snapshot {
    pub chain: Vec<Block>,
    pub pending: Vec<Transaction>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub faults: Vec<Fault>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub identity: String,
    pub balance: i128,
}

fn error_response(err: LedgerError) -> (StatusCode, String) {
    let status = match err {
        LedgerError::InvalidAmount => StatusCode::BAD_REQUEST,
        LedgerError::Persistence(_) | LedgerError::Corruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// GET /chain/head
pub async fn chain_head(State(state): State<AppState>) -> Json<Head> {
    let ledger = state.ledger.read().unwrap();
    let (height, hash) = ledger.tip();
    Json(Head {
        height,
        hash: hex::encode(hash),
    })
}

/// POST /donations: record one donation as its own block.
pub async fn record_donation(
    State(state): State<AppState>,
    Json(input): Json<DonationInput>,
) -> Result<Json<Receipt>, (StatusCode, String)> {
    let mut ledger = state.ledger.write().unwrap();
    ledger
        .record_donation(input.donor, input.charity, input.amount, input.message)
        .map(Json)
        .map_err(error_response)
}

/// POST /transactions: queue a donation without sealing a block, for
/// callers that batch several donations per block.
pub async fn queue_transaction(
    State(state): State<AppState>,
    Json(input): Json<DonationInput>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let mut ledger = state.ledger.write().unwrap();
    let tx = ledger
        .add_transaction(input.donor, input.charity, input.amount, input.message)
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({ "accepted": true, "tx": tx })))
}

/// POST /mine: seal the pending buffer into one block.
pub async fn mine(State(state): State<AppState>) -> Result<Json<Block>, (StatusCode, String)> {
    let mut ledger = state.ledger.write().unwrap();
    ledger.mine().map(Json).map_err(error_response)
}

/// GET /ledger: full snapshot for transparency display.
pub async fn ledger_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    let ledger = state.ledger.read().unwrap();
    Json(Snapshot {
        chain: ledger.chain(),
        pending: ledger.pending(),
    })
}

/// GET /verify: integrity audit; tampering is data, not an HTTP error.
pub async fn verify(State(state): State<AppState>) -> Json<VerifyResponse> {
    let ledger = state.ledger.read().unwrap();
    let faults = ledger.audit();
    Json(VerifyResponse {
        ok: faults.is_empty(),
        faults,
    })
}

/// GET /balance/{identity}
pub async fn balance(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Json<BalanceResponse> {
    let ledger = state.ledger.read().unwrap();
    let balance = ledger.balance_of(&identity);
    Json(BalanceResponse { identity, balance })
}

/// GET /donations/{identity}: mined history for an identity.
pub async fn donation_history(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Json<Vec<Transaction>> {
    let ledger = state.ledger.read().unwrap();
    Json(ledger.transactions_for(&identity))
}
