//! Request identity contract.
//!
//! Flow Overview: an [`IdentityResolver`] turns the request headers into an
//! optional [`RequestIdentity`] exactly once per request; the result is stored
//! as [`CurrentIdentity`] in the request extensions and read by the gate and
//! the loaders. Nothing here decides authorization.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use utoipa::ToSchema;

/// Authenticated-user record attached by the identity step.
///
/// Resolvers guarantee `email` is present whenever `is_authenticated` is true.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub is_authenticated: bool,
}

impl RequestIdentity {
    #[must_use]
    pub fn authenticated(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: Some(email.into()),
            is_authenticated: true,
        }
    }
}

/// The identity resolved for the current request, if any.
#[derive(Clone, Debug, Default)]
pub struct CurrentIdentity(pub Option<RequestIdentity>);

impl CurrentIdentity {
    #[must_use]
    pub fn get(&self) -> Option<&RequestIdentity> {
        self.0.as_ref()
    }

    /// Identity only when the upstream step marked it authenticated.
    #[must_use]
    pub fn authenticated(&self) -> Option<&RequestIdentity> {
        self.0.as_ref().filter(|identity| identity.is_authenticated)
    }
}

// Missing extension means the resolver layer did not run; treat as anonymous.
#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_default())
    }
}

/// Upstream authentication step.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve the caller from request headers.
    ///
    /// `Ok(None)` means anonymous. Errors are collaborator failures; the
    /// middleware logs them and continues anonymously.
    async fn resolve(&self, headers: &HeaderMap) -> anyhow::Result<Option<RequestIdentity>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn authenticated_constructor_sets_email() {
        let identity = RequestIdentity::authenticated("u1", "a@x.com");
        assert!(identity.is_authenticated);
        assert_eq!(identity.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn current_identity_filters_unauthenticated() {
        let identity = RequestIdentity {
            uid: "u1".to_string(),
            email: Some("a@x.com".to_string()),
            is_authenticated: false,
        };
        let current = CurrentIdentity(Some(identity));
        assert!(current.get().is_some());
        assert!(current.authenticated().is_none());
    }

    #[test]
    fn identity_serializes_camel_case() -> anyhow::Result<()> {
        let value = serde_json::to_value(RequestIdentity::authenticated("u1", "a@x.com"))?;
        assert_eq!(value["isAuthenticated"], serde_json::json!(true));
        assert_eq!(value["uid"], serde_json::json!("u1"));
        Ok(())
    }

    #[tokio::test]
    async fn extractor_defaults_to_anonymous() -> anyhow::Result<()> {
        let (mut parts, ()) = Request::builder().uri("/").body(())?.into_parts();
        let current = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap_or_default();
        assert!(current.get().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn extractor_reads_extension() -> anyhow::Result<()> {
        let (mut parts, ()) = Request::builder().uri("/").body(())?.into_parts();
        parts.extensions.insert(CurrentIdentity(Some(
            RequestIdentity::authenticated("u1", "a@x.com"),
        )));
        let current = CurrentIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap_or_default();
        assert_eq!(current.get().map(|identity| identity.uid.as_str()), Some("u1"));
        Ok(())
    }
}
