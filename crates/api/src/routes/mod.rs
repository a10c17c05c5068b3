//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod balances;
pub mod expenses;
pub mod groups;
pub mod health;
pub mod reminders;
pub mod settlements;
pub mod users;

/// Creates the API router with all routes.
///
/// Everything except health and user registration requires the `x-user-id`
/// header, which handlers enforce through the [`crate::middleware::Actor`]
/// extractor.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(expenses::routes())
        .merge(groups::routes())
        .merge(balances::routes())
        .merge(settlements::routes())
        .merge(reminders::routes())
}
