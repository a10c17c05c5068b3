//! Expense routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_db::ExpenseRepository;
use tally_db::repositories::{ExpenseUpdate, NewExpense};
use tally_shared::types::{ExpenseId, GroupId, UserId};
use tracing::info;

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        .route("/expenses/mark-paid", post(mark_as_paid))
        .route(
            "/expenses/{expense_id}",
            get(get_expense).put(edit_expense).delete(delete_expense),
        )
        .route("/friends/{friend_id}/expenses", get(list_with_friend))
}

/// Request body for recording a payment made outside the app.
#[derive(Debug, Deserialize)]
pub struct MarkPaidRequest {
    /// Who was paid.
    pub friend_id: UserId,
    /// Amount paid.
    pub amount: Decimal,
    /// Ledger currency.
    pub currency: String,
    /// Group the debt belongs to, if any.
    pub group_id: Option<GroupId>,
}

fn repository(state: &AppState) -> ExpenseRepository {
    ExpenseRepository::new(state.conn(), (*state.precision).clone())
}

/// POST /expenses
async fn create_expense(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<NewExpense>,
) -> Result<impl IntoResponse, ApiError> {
    let created = repository(&state).create_expense(actor, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET `/expenses/{expense_id}`
async fn get_expense(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(expense_id): Path<ExpenseId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(repository(&state).find_by_id(actor, expense_id).await?))
}

/// PUT `/expenses/{expense_id}`
async fn edit_expense(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(expense_id): Path<ExpenseId>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let edited = repository(&state)
        .edit_expense(actor, expense_id, payload)
        .await?;
    Ok(Json(edited))
}

/// DELETE `/expenses/{expense_id}`
async fn delete_expense(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(expense_id): Path<ExpenseId>,
) -> Result<impl IntoResponse, ApiError> {
    repository(&state).delete_expense(actor, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /expenses/mark-paid
async fn mark_as_paid(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recorded = repository(&state)
        .mark_as_paid(
            actor,
            payload.friend_id,
            payload.amount,
            &payload.currency,
            payload.group_id,
        )
        .await?;

    info!(
        expense_id = %recorded.expense.id,
        payer = %actor,
        friend = %payload.friend_id,
        "payment recorded"
    );
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// GET `/friends/{friend_id}/expenses`
async fn list_with_friend(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(friend_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let expenses = repository(&state).list_with_friend(actor, friend_id).await?;
    Ok(Json(serde_json::json!({ "expenses": expenses })))
}
