//! Error taxonomy shared by the gate and the route loaders.
//!
//! Every variant maps to exactly one HTTP response. Internal details of
//! `Service` errors stay in the logs; clients only see a generic message.

use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum GateError {
    /// Admin gate denial. Rendered as a redirect to the site root.
    #[error("admin access denied")]
    Unauthorized,
    /// No authenticated identity on an API route that needs one.
    #[error("authentication required")]
    Unauthenticated,
    /// CSRF verification failed on a state-changing request.
    #[error("CSRF token validation failed")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("failed to generate CSRF token")]
    TokenGeneration(#[source] rand::Error),
    #[error(transparent)]
    Service(#[from] anyhow::Error),
}

impl GateError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::TokenGeneration(_) | Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Unauthorized => (status, [(LOCATION, "/")]).into_response(),
            Self::Unauthenticated => (status, Json(json!({ "error": "Unauthorized" }))).into_response(),
            Self::TokenGeneration(ref err) => {
                error!("CSRF token generation failed: {err}");
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
            Self::Service(ref err) => {
                error!("Service error: {err:#}");
                (status, Json(json!({ "error": "Internal server error" }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn unauthorized_redirects_to_root() {
        let response = GateError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("/")
        );
    }

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(GateError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(GateError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GateError::NotFound("topic").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GateError::BadRequest("title".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GateError::Service(anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(GateError::NotFound("topic").to_string(), "topic not found");
    }

    #[test]
    fn service_error_hides_details() {
        let response = GateError::Service(anyhow!("password=hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
