//! User registration and lookup.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tally_core::ledger::LedgerError;
use tally_db::UserRepository;
use tally_shared::types::UserId;

use crate::{AppState, error::ApiError};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{user_id}", get(get_user))
}

/// Request body for registering a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Unique email.
    pub email: String,
    /// Display name.
    pub name: String,
}

/// POST /users
async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A valid email is required"));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Name must not be empty"));
    }

    let user = UserRepository::new(state.conn())
        .create(email, payload.name.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET `/users/{user_id}`
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserRepository::new(state.conn())
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("user", user_id.0))?;
    Ok(Json(user))
}
