//! Group routes: membership, group expenses, and group balances.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::json;
use tally_core::ledger::AccessPolicy;
use tally_db::{BalanceRepository, ExpenseRepository, GroupRepository, SettlementRepository};
use tally_shared::types::{GroupId, UserId};

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the group routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group).get(list_groups))
        .route("/groups/{group_id}", get(get_group).delete(delete_group))
        .route("/groups/{group_id}/members", post(add_member))
        .route("/groups/{group_id}/members/{user_id}", delete(remove_member))
        .route("/groups/{group_id}/expenses", get(list_expenses))
        .route("/groups/{group_id}/balances", get(group_balances))
        .route("/groups/{group_id}/settle-all", post(settle_with_everyone))
}

/// Request body for creating a group.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    /// Group name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

/// Request body for adding a member.
#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    /// User to add.
    pub user_id: UserId,
}

/// Request body for settling every debt in a group.
#[derive(Debug, Deserialize)]
pub struct SettleAllRequest {
    /// Ledger currency to settle.
    pub currency: String,
}

/// POST /groups
async fn create_group(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Group name must not be empty"));
    }
    let group = GroupRepository::new(state.conn())
        .create(actor, &payload.name, payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /groups - every group of the caller with their totals.
async fn list_groups(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let groups = BalanceRepository::new(state.conn())
        .groups_with_balances(actor)
        .await?;
    Ok(Json(json!({ "groups": groups })))
}

/// GET `/groups/{group_id}`
async fn get_group(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(group_id): Path<GroupId>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = GroupRepository::new(state.conn());
    let group = repo.find(group_id).await?;
    let members = repo.member_ids(group_id).await?;
    AccessPolicy::ensure_members(actor, [], &members)?;

    let mut members: Vec<UserId> = members.into_iter().collect();
    members.sort();
    Ok(Json(json!({ "group": group, "members": members })))
}

/// DELETE `/groups/{group_id}`
async fn delete_group(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(group_id): Path<GroupId>,
) -> Result<impl IntoResponse, ApiError> {
    GroupRepository::new(state.conn())
        .delete_group(actor, group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/groups/{group_id}/members`
async fn add_member(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(group_id): Path<GroupId>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    GroupRepository::new(state.conn())
        .add_member(actor, group_id, payload.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE `/groups/{group_id}/members/{user_id}`
async fn remove_member(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((group_id, user_id)): Path<(GroupId, UserId)>,
) -> Result<impl IntoResponse, ApiError> {
    GroupRepository::new(state.conn())
        .remove_member(actor, group_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/groups/{group_id}/expenses`
async fn list_expenses(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(group_id): Path<GroupId>,
) -> Result<impl IntoResponse, ApiError> {
    let expenses = ExpenseRepository::new(state.conn(), (*state.precision).clone())
        .list_for_group(actor, group_id)
        .await?;
    Ok(Json(json!({ "expenses": expenses })))
}

/// GET `/groups/{group_id}/balances`
async fn group_balances(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(group_id): Path<GroupId>,
) -> Result<impl IntoResponse, ApiError> {
    let view = BalanceRepository::new(state.conn())
        .group_balances(actor, group_id)
        .await?;
    Ok(Json(view))
}

/// POST `/groups/{group_id}/settle-all`
async fn settle_with_everyone(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(group_id): Path<GroupId>,
    Json(payload): Json<SettleAllRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let settlement = SettlementRepository::new(state.conn(), (*state.precision).clone())
        .settle_with_everyone(actor, group_id, &payload.currency)
        .await?;
    Ok((StatusCode::CREATED, Json(settlement)))
}
