use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::{ApiError, NO_USER_ID};
use crate::AppState;

/// Identity of the caller, resolved once per request and passed to every handler.
///
/// There is no authentication, so every request acts as the configured user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for UserContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = state.config.user_id.trim();
        if user_id.is_empty() {
            return Err(ApiError::validation(NO_USER_ID));
        }
        Ok(Self {
            user_id: user_id.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use kernel::ErrorReply;
    use tower::ServiceExt;

    fn app(user: &str) -> axum::Router {
        let root = std::env::temp_dir().join("imgstore_user_test");
        let config =
            Config::new(3000, "uploads", root, "http://localhost:3000", user).unwrap();
        crate::create_routes(config)
    }

    #[tokio::test]
    async fn empty_user_is_rejected() {
        // Arrange
        let request = Request::get("/images").body(Body::empty()).unwrap();

        // Act
        let response = app("  ").oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let reply: ErrorReply = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply.error, NO_USER_ID);
    }
}
