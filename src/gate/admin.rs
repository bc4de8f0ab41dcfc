//! Admin route gate.
//!
//! A request to an admin route is permitted iff its path is explicitly
//! bypassed, or the caller is authenticated with an email present in the
//! allow-list. Everything else is denied with a redirect to `/`.

use super::{
    allow_list::AdminAllowList,
    error::GateError,
    identity::RequestIdentity,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, warn};

/// Diagnostic page that stays reachable without admin rights.
pub const DIAGNOSTIC_PATH: &str = "/admin/debug";

/// Paths exempt from the admin check. Matching is exact: no prefixes, no
/// trailing-slash normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateBypass {
    paths: Vec<String>,
}

impl GateBypass {
    #[must_use]
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// No bypass at all.
    #[must_use]
    pub fn none() -> Self {
        Self { paths: Vec::new() }
    }

    /// Only the diagnostic page.
    #[must_use]
    pub fn diagnostic() -> Self {
        Self::new([DIAGNOSTIC_PATH])
    }

    #[must_use]
    pub fn permits(&self, path: &str) -> bool {
        self.paths.iter().any(|bypassed| bypassed == path)
    }
}

impl Default for GateBypass {
    fn default() -> Self {
        Self::diagnostic()
    }
}

/// Outcome of a successful gate evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Path is exempt; the identity was not consulted.
    Bypassed,
    Admitted(RequestIdentity),
}

#[derive(Clone, Debug, Default)]
pub struct AdminGate {
    allow_list: AdminAllowList,
    bypass: GateBypass,
}

impl AdminGate {
    #[must_use]
    pub fn new(allow_list: AdminAllowList) -> Self {
        Self {
            allow_list,
            bypass: GateBypass::default(),
        }
    }

    #[must_use]
    pub fn with_bypass(mut self, bypass: GateBypass) -> Self {
        self.bypass = bypass;
        self
    }

    #[must_use]
    pub fn allow_list(&self) -> &AdminAllowList {
        &self.allow_list
    }

    /// True iff the identity is authenticated and its email is allow-listed.
    #[must_use]
    pub fn is_admin(&self, identity: Option<&RequestIdentity>) -> bool {
        identity
            .filter(|identity| identity.is_authenticated)
            .and_then(|identity| identity.email.as_deref())
            .is_some_and(|email| self.allow_list.contains(email))
    }

    /// Decide whether `path` may be served to `identity`.
    ///
    /// # Errors
    /// Returns [`GateError::Unauthorized`] when the request must be redirected.
    pub fn evaluate(
        &self,
        identity: Option<&RequestIdentity>,
        path: &str,
    ) -> Result<GateDecision, GateError> {
        if self.bypass.permits(path) {
            debug!(path, "admin gate bypassed");
            return Ok(GateDecision::Bypassed);
        }

        match identity {
            Some(identity) if self.is_admin(Some(identity)) => {
                Ok(GateDecision::Admitted(identity.clone()))
            }
            Some(identity) if identity.is_authenticated => {
                warn!(uid = %identity.uid, path, "admin access denied");
                Err(GateError::Unauthorized)
            }
            _ => {
                debug!(path, "anonymous admin access denied");
                Err(GateError::Unauthorized)
            }
        }
    }
}

/// Identity admitted by the admin gate, available to admin handlers.
///
/// Inserted by the gate middleware; extraction fails with a redirect when the
/// gate did not admit the request (including bypassed paths).
#[derive(Clone, Debug)]
pub struct AdminUser(pub RequestIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(GateError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn gate(raw: &str) -> AdminGate {
        AdminGate::new(AdminAllowList::parse(raw))
    }

    fn anonymous_with_email(email: &str) -> RequestIdentity {
        RequestIdentity {
            uid: "u-anon".to_string(),
            email: Some(email.to_string()),
            is_authenticated: false,
        }
    }

    #[test]
    fn allow_listed_user_is_admitted() {
        let gate = gate("a@x.com, b@y.com");
        let identity = RequestIdentity::authenticated("u1", "b@y.com");
        assert_eq!(
            gate.evaluate(Some(&identity), "/admin/users").ok(),
            Some(GateDecision::Admitted(identity))
        );
    }

    #[test]
    fn anonymous_is_denied() {
        let gate = gate("a@x.com");
        assert!(matches!(
            gate.evaluate(None, "/admin"),
            Err(GateError::Unauthorized)
        ));
    }

    #[test]
    fn case_mismatch_is_denied() {
        let gate = gate("a@x.com, b@y.com");
        let identity = RequestIdentity::authenticated("u1", "A@x.com");
        assert!(gate.evaluate(Some(&identity), "/admin").is_err());
    }

    #[test]
    fn unauthenticated_identity_with_listed_email_is_denied() {
        let gate = gate("a@x.com");
        let identity = anonymous_with_email("a@x.com");
        assert!(!gate.is_admin(Some(&identity)));
        assert!(gate.evaluate(Some(&identity), "/admin").is_err());
    }

    #[test]
    fn authenticated_without_email_is_denied() {
        let gate = gate("a@x.com");
        let identity = RequestIdentity {
            uid: "u1".to_string(),
            email: None,
            is_authenticated: true,
        };
        assert!(gate.evaluate(Some(&identity), "/admin").is_err());
    }

    #[test]
    fn empty_allow_list_denies_everyone() {
        let gate = gate("");
        let identity = RequestIdentity::authenticated("u1", "a@x.com");
        assert!(gate.evaluate(Some(&identity), "/admin").is_err());
    }

    #[test]
    fn whitespace_around_email_is_tolerated() {
        let gate = gate(" a@x.com ");
        let identity = RequestIdentity::authenticated("u1", " a@x.com");
        assert!(gate.evaluate(Some(&identity), "/admin").is_ok());
    }

    #[test]
    fn diagnostic_path_bypasses_for_anyone() {
        let gate = gate("");
        assert_eq!(
            gate.evaluate(None, DIAGNOSTIC_PATH).ok(),
            Some(GateDecision::Bypassed)
        );
        let outsider = RequestIdentity::authenticated("u2", "nobody@z.com");
        assert_eq!(
            gate.evaluate(Some(&outsider), DIAGNOSTIC_PATH).ok(),
            Some(GateDecision::Bypassed)
        );
    }

    #[test]
    fn bypass_is_exact() {
        let gate = gate("");
        for path in [
            "/admin/debug/",
            "/admin/debugger",
            "/admin/debug/x",
            "/admin",
            "/ADMIN/DEBUG",
        ] {
            assert!(
                gate.evaluate(None, path).is_err(),
                "{path} must not be bypassed"
            );
        }
    }

    #[test]
    fn bypass_can_be_disabled() {
        let gate = gate("").with_bypass(GateBypass::none());
        assert!(gate.evaluate(None, DIAGNOSTIC_PATH).is_err());
    }

    #[test]
    fn decision_is_permit_iff_bypass_or_listed() {
        let gate = gate("a@x.com, b@y.com");
        let identities = [
            None,
            Some(RequestIdentity::authenticated("u1", "a@x.com")),
            Some(RequestIdentity::authenticated("u2", "b@y.com")),
            Some(RequestIdentity::authenticated("u3", "c@z.com")),
            Some(RequestIdentity::authenticated("u4", "A@X.COM")),
            Some(anonymous_with_email("a@x.com")),
        ];
        let paths = ["/admin", "/admin/users", "/admin/forums", DIAGNOSTIC_PATH];

        for identity in &identities {
            for path in paths {
                let expected = path == DIAGNOSTIC_PATH
                    || identity.as_ref().is_some_and(|identity| {
                        identity.is_authenticated
                            && identity
                                .email
                                .as_deref()
                                .is_some_and(|email| email == "a@x.com" || email == "b@y.com")
                    });
                assert_eq!(
                    gate.evaluate(identity.as_ref(), path).is_ok(),
                    expected,
                    "identity={identity:?} path={path}"
                );
            }
        }
    }

    #[tokio::test]
    async fn admin_user_extractor() -> anyhow::Result<()> {
        let (mut parts, ()) = Request::builder().uri("/admin").body(())?.into_parts();
        parts
            .extensions
            .insert(AdminUser(RequestIdentity::authenticated("u1", "a@x.com")));
        let admitted = AdminUser::from_request_parts(&mut parts, &()).await;
        assert!(admitted.is_ok());

        let (mut parts, ()) = Request::builder().uri("/admin").body(())?.into_parts();
        let rejected = AdminUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(rejected, Err(GateError::Unauthorized)));
        Ok(())
    }
}
