//! Explicit CSRF token endpoints for script clients.

use super::types::CsrfTokenResponse;
use crate::gate::{CsrfToken, GateError, RotatedCsrfToken};
use axum::response::{IntoResponse, Json, Response};
use tracing::debug;

#[utoipa::path(
    get,
    path = "/api/csrf/init",
    responses(
        (status = 200, description = "Current CSRF token, also mirrored in X-CSRF-Token", body = CsrfTokenResponse),
    ),
    tag = "csrf"
)]
pub async fn init(token: CsrfToken) -> impl IntoResponse {
    Json(CsrfTokenResponse {
        token: token.expose().to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/csrf/refresh",
    responses(
        (status = 200, description = "Newly generated CSRF token; the cookie is replaced", body = CsrfTokenResponse),
        (status = 500, description = "Token generation failed"),
    ),
    tag = "csrf"
)]
pub async fn refresh() -> Result<Response, GateError> {
    let token = CsrfToken::generate()?;
    debug!("Rotated CSRF token");

    let mut response = Json(CsrfTokenResponse {
        token: token.expose().to_string(),
    })
    .into_response();
    // The issuance layer writes the cookie and header for the rotated token.
    response.extensions_mut().insert(RotatedCsrfToken(token));

    Ok(response)
}
