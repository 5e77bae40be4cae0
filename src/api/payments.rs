//! Payment endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::AppState;
use crate::services::PaymentRequest;
use crate::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payment", post(process_payment))
        .route("/api/payment/verify/:tx_ref", get(verify_payment))
}

async fn process_payment(State(s): State<AppState>, Json(req): Json<PaymentRequest>) -> Result<Json<serde_json::Value>> {
    let link = s.payments.process_payment(&req).await?;
    Ok(Json(json!({ "authorizationUrl": link })))
}

async fn verify_payment(State(s): State<AppState>, Path(tx_ref): Path<String>) -> Result<Json<serde_json::Value>> {
    let status = s.payments.verify_payment(&tx_ref).await?;
    Ok(Json(json!({ "result": status.message(), "status": status })))
}
