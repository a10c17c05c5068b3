//! Settlement routes.
//!
//! The payment subsystem reports its verified result through
//! `POST /settlements/{id}/confirm`; the ledger moves only on a matching
//! success.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tally_core::settlement::{NewSettlement, PaymentConfirmation};
use tally_db::SettlementRepository;
use tally_shared::types::SettlementId;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the settlement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/settlements", post(create_settlement).get(list_settlements))
        .route("/settlements/{settlement_id}", get(get_settlement))
        .route("/settlements/{settlement_id}/confirm", post(confirm_settlement))
}

fn repository(state: &AppState) -> SettlementRepository {
    SettlementRepository::new(state.conn(), (*state.precision).clone())
}

/// POST /settlements
async fn create_settlement(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<NewSettlement>,
) -> Result<impl IntoResponse, ApiError> {
    let settlement = repository(&state)
        .create_settlement(actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(settlement)))
}

/// GET /settlements
async fn list_settlements(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let settlements = repository(&state)
        .list_for_user(actor)
        .await?;
    Ok(Json(json!({ "settlements": settlements })))
}

/// GET `/settlements/{settlement_id}`
async fn get_settlement(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(settlement_id): Path<SettlementId>,
) -> Result<impl IntoResponse, ApiError> {
    let settlement = repository(&state)
        .find(actor, settlement_id)
        .await?;
    Ok(Json(settlement))
}

/// POST `/settlements/{settlement_id}/confirm`
async fn confirm_settlement(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(settlement_id): Path<SettlementId>,
    Json(payload): Json<PaymentConfirmation>,
) -> Result<impl IntoResponse, ApiError> {
    let success = payload.success;
    let settlement = repository(&state)
        .confirm_settlement(actor, settlement_id, payload)
        .await?;

    info!(
        settlement_id = %settlement_id,
        reported_success = success,
        status = %settlement.status(),
        "payment confirmation processed"
    );
    Ok(Json(settlement))
}
