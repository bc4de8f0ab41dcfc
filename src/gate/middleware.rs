//! Axum middleware wiring the gate into the router.
//!
//! Layer order (outermost first): `resolve_identity` → `issue_csrf` →
//! `verify_csrf` → `require_identity` / `require_admin` → handler.

use super::{
    admin::{AdminGate, AdminUser, GateDecision},
    csrf::{self, CsrfConfig, RotatedCsrfToken, CSRF_HEADER},
    error::GateError,
    identity::{CurrentIdentity, IdentityResolver},
};
use anyhow::anyhow;
use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Methods that never change state and skip CSRF verification.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Resolve the caller once and store it as [`CurrentIdentity`].
///
/// Resolver failures are logged and the request continues anonymously.
pub async fn resolve_identity(
    State(resolver): State<Arc<dyn IdentityResolver>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<CurrentIdentity>().is_none() {
        // Request bodies are not Sync; resolve against an owned copy.
        let headers = request.headers().clone();
        let identity = match resolver.resolve(&headers).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!("Identity resolution failed, continuing anonymously: {err:#}");
                None
            }
        };
        request.extensions_mut().insert(CurrentIdentity(identity));
    }

    next.run(request).await
}

/// Make sure every request has a CSRF token and persist new ones.
pub async fn issue_csrf(
    State(config): State<Arc<CsrfConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let issued = match csrf::issue(request.headers()) {
        Ok(issued) => issued,
        Err(err) => return err.into_response(),
    };
    if issued.fresh {
        debug!("Issued new CSRF token");
    }
    request.extensions_mut().insert(issued.token.clone());

    let mut response = next.run(request).await;

    // A rotation by the handler replaces the request token; either way the
    // cookie is written at most once.
    let (token, persist) = match response.extensions_mut().remove::<RotatedCsrfToken>() {
        Some(RotatedCsrfToken(rotated)) => (rotated, true),
        None => (issued.token, issued.fresh),
    };

    if persist {
        match config.cookie(&token) {
            Ok(cookie) => {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Err(err) => {
                error!("Failed to encode CSRF cookie: {err}");
                return GateError::Service(anyhow!("invalid CSRF cookie")).into_response();
            }
        }
    }

    match token.header_value() {
        Ok(value) => {
            response.headers_mut().insert(CSRF_HEADER, value);
        }
        Err(err) => warn!("CSRF token is not a valid header value: {err}"),
    }

    response
}

/// Reject state-changing `/api/*` requests whose header does not match the
/// cookie.
pub async fn verify_csrf(request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) || !request.uri().path().starts_with("/api/") {
        return next.run(request).await;
    }

    if let Err(err) = csrf::verify(request.headers()) {
        warn!(
            method = %request.method(),
            path = request.uri().path(),
            "CSRF validation failed"
        );
        return err.into_response();
    }

    next.run(request).await
}

/// Admin gate. Admitted requests carry [`AdminUser`] for the handlers.
pub async fn require_admin(
    State(gate): State<Arc<AdminGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let current = request
        .extensions()
        .get::<CurrentIdentity>()
        .cloned()
        .unwrap_or_default();

    match gate.evaluate(current.get(), request.uri().path()) {
        Ok(GateDecision::Admitted(identity)) => {
            request.extensions_mut().insert(AdminUser(identity));
            next.run(request).await
        }
        Ok(GateDecision::Bypassed) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// Reject API calls without an authenticated caller.
pub async fn require_identity(request: Request, next: Next) -> Response {
    let authenticated = request
        .extensions()
        .get::<CurrentIdentity>()
        .is_some_and(|current| current.authenticated().is_some());

    if authenticated {
        next.run(request).await
    } else {
        GateError::Unauthenticated.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_methods() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE] {
            assert!(is_safe_method(&method), "{method}");
        }
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(!is_safe_method(&method), "{method}");
        }
    }
}
