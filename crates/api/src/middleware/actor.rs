//! Caller identity.
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user id in the `x-user-id` header, and every ledger operation re-checks
//! authorization against stored data.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde_json::json;
use tally_shared::types::UserId;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request.
///
/// ```ignore
/// async fn handler(Actor(user_id): Actor) -> impl IntoResponse {
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub UserId);

impl Actor {
    /// Returns the caller's user id.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
        else {
            return Err(rejection(
                "missing_user",
                "The x-user-id header is required",
            ));
        };

        raw.trim()
            .parse::<UserId>()
            .map(Actor)
            .map_err(|_| rejection("invalid_user", "The x-user-id header is not a valid id"))
    }
}

fn rejection(error: &str, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": error, "message": message })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    async fn extract(header: Option<&str>) -> Result<Actor, StatusCode> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &())
            .await
            .map_err(|(status, _)| status)
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = Uuid::new_v4();
        let actor = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(actor.user_id(), UserId::from_uuid(id));
    }

    #[tokio::test]
    async fn test_missing_or_malformed_header() {
        assert_eq!(extract(None).await.unwrap_err(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            extract(Some("not-a-uuid")).await.unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }
}
