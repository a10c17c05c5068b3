//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over the ledger repositories
//! - The caller identity extractor
//! - JSON error responses

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tally_core::ledger::PrecisionPolicy;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Minor-unit precision applied to new splits.
    pub precision: Arc<PrecisionPolicy>,
}

impl AppState {
    /// Builds the state from a connection and a precision policy.
    #[must_use]
    pub fn new(db: DatabaseConnection, precision: PrecisionPolicy) -> Self {
        Self {
            db: Arc::new(db),
            precision: Arc::new(precision),
        }
    }

    pub(crate) fn conn(&self) -> DatabaseConnection {
        (*self.db).clone()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
