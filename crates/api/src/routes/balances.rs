//! Read-only balance views.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tally_core::balances::BalanceQueries;
use tally_db::BalanceRepository;

use crate::{AppState, error::ApiError, middleware::Actor};

/// Creates the balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/balances", get(balance_summary))
        .route("/balances/friends", get(friends_with_balances))
        .route("/balances/analytics", get(monthly_analytics))
}

/// Query parameters for monthly analytics.
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// Month as `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
}

/// GET /balances - what the caller owes and is owed, per currency.
async fn balance_summary(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let summary = BalanceRepository::new(state.conn())
        .balance_summary(actor)
        .await?;
    Ok(Json(summary))
}

/// GET /balances/friends
async fn friends_with_balances(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<impl IntoResponse, ApiError> {
    let friends = BalanceRepository::new(state.conn())
        .friends_with_balances(actor)
        .await?;
    Ok(Json(json!({ "friends": friends })))
}

/// GET /balances/analytics?month=YYYY-MM
async fn monthly_analytics(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let month = match query.month.as_deref() {
        Some(raw) => BalanceQueries::parse_month(raw)
            .ok_or_else(|| ApiError::validation("month must be formatted as YYYY-MM"))?,
        None => Utc::now().date_naive(),
    };

    let analytics = BalanceRepository::new(state.conn())
        .monthly_analytics(actor, month)
        .await?;
    Ok(Json(analytics))
}
