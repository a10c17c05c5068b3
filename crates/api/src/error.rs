//! Rendering of errors as JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::ledger::LedgerError;
use tally_db::StoreError;
use tally_shared::AppError;
use tracing::error;

/// An [`AppError`] on its way out as an HTTP response.
///
/// Every failure renders as `{"error": <code>, "message": <text>}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Rejects a malformed request body or parameter.
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // store failures carry driver text; log it, keep it off the wire
        let message = if status.is_server_error() {
            error!(error = %self.0, "request failed");
            "The operation was not applied; retry the request".to_string()
        } else {
            self.0.to_string()
        };

        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use uuid::Uuid;

    #[rstest]
    #[case(LedgerError::not_found("expense", Uuid::nil()), StatusCode::NOT_FOUND)]
    #[case(LedgerError::unauthorized(Uuid::nil(), "edit"), StatusCode::FORBIDDEN)]
    #[case(LedgerError::OutstandingBalance("group".into()), StatusCode::CONFLICT)]
    #[case(LedgerError::NotEligible("nothing owed".into()), StatusCode::UNPROCESSABLE_ENTITY)]
    #[case(LedgerError::TransactionFailure("deadlock".into()), StatusCode::SERVICE_UNAVAILABLE)]
    fn test_ledger_error_status(#[case] err: LedgerError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(err).into_response().status(), status);
    }

    #[tokio::test]
    async fn test_transaction_failure_hides_detail() {
        use http_body_util::BodyExt;

        let response =
            ApiError(AppError::TransactionFailed("relation \"balances\": deadlock".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "TRANSACTION_FAILED");
        assert!(!body["message"].as_str().unwrap().contains("balances"));
    }
}
