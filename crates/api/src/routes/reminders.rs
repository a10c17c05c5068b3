//! Reminder routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tally_db::ReminderRepository;
use tally_db::repositories::NewReminder;
use tally_shared::types::ReminderId;

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the reminder routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reminders", post(send_reminder).get(list_reminders))
        .route("/reminders/{reminder_id}/respond", post(respond))
}

/// Receiver's answer to a reminder.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    /// Accept (`true`) or reject (`false`).
    pub accept: bool,
}

async fn send_reminder(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<NewReminder>,
) -> Result<impl IntoResponse, ApiError> {
    let reminder = ReminderRepository::new(state.conn())
        .create(actor, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

async fn list_reminders(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let reminders = ReminderRepository::new(state.conn())
        .list_for_receiver(actor)
        .await?;
    Ok(Json(json!({ "reminders": reminders })))
}

async fn respond(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(reminder_id): Path<ReminderId>,
    Json(payload): Json<RespondRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reminder = ReminderRepository::new(state.conn())
        .respond(actor, reminder_id, payload.accept)
        .await?;
    Ok(Json(reminder))
}
