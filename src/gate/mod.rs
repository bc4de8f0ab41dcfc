//! Authorization and CSRF gate.
//!
//! Two guards run in front of the route loaders:
//!
//! - the admin gate ([`AdminGate`]) permits admin routes only for
//!   authenticated callers whose email is in the configured allow-list,
//!   redirecting everyone else to `/`;
//! - CSRF issuance ([`middleware::issue_csrf`]) makes sure each request has a
//!   double-submit token, persisted in the `csrf_token` cookie.
//!
//! Identity is resolved upstream by an [`IdentityResolver`] and passed around
//! as [`CurrentIdentity`].

pub mod admin;
pub mod allow_list;
pub mod cookies;
pub mod csrf;
pub mod error;
pub mod identity;
pub mod middleware;

pub use admin::{AdminGate, AdminUser, GateBypass, GateDecision, DIAGNOSTIC_PATH};
pub use allow_list::AdminAllowList;
pub use csrf::{CsrfConfig, CsrfToken, RotatedCsrfToken, CSRF_COOKIE_NAME, CSRF_HEADER};
pub use error::GateError;
pub use identity::{CurrentIdentity, IdentityResolver, RequestIdentity};

use anyhow::{Context, Result};
use std::fmt;
use url::Url;

pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// Gate configuration collected from the CLI.
#[derive(Clone)]
pub struct GateConfig {
    admin_emails: String,
    public_base_url: String,
    csrf_cookie_max_age_seconds: u64,
}

// Admin addresses stay out of debug output.
impl fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateConfig")
            .field("admin_emails", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .field(
                "csrf_cookie_max_age_seconds",
                &self.csrf_cookie_max_age_seconds,
            )
            .finish()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl GateConfig {
    #[must_use]
    pub fn new(admin_emails: String) -> Self {
        Self {
            admin_emails,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            csrf_cookie_max_age_seconds: csrf::DEFAULT_COOKIE_MAX_AGE_SECONDS,
        }
    }

    #[must_use]
    pub fn with_public_base_url(mut self, url: String) -> Self {
        self.public_base_url = url;
        self
    }

    #[must_use]
    pub fn with_csrf_cookie_max_age_seconds(mut self, seconds: u64) -> Self {
        self.csrf_cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Parse the allow-list once for the lifetime of the process.
    #[must_use]
    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(AdminAllowList::parse(&self.admin_emails))
    }

    /// Cookie settings; `Secure` follows the scheme of the public base URL.
    ///
    /// # Errors
    /// Returns an error if the public base URL cannot be parsed.
    pub fn csrf_config(&self) -> Result<CsrfConfig> {
        let url = Url::parse(&self.public_base_url)
            .with_context(|| format!("Invalid public base URL: {}", self.public_base_url))?;
        Ok(CsrfConfig::new()
            .with_secure(url.scheme() == "https")
            .with_cookie_max_age_seconds(self.csrf_cookie_max_age_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_base_url_sets_secure() -> Result<()> {
        let config = GateConfig::new(String::new())
            .with_public_base_url("https://learnflow.com".to_string());
        assert!(config.csrf_config()?.secure());

        let config = GateConfig::default();
        assert!(!config.csrf_config()?.secure());
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_an_error() {
        let config = GateConfig::default().with_public_base_url("not a url".to_string());
        assert!(config.csrf_config().is_err());
    }

    #[test]
    fn max_age_is_forwarded() -> Result<()> {
        let config = GateConfig::default().with_csrf_cookie_max_age_seconds(120);
        assert_eq!(config.csrf_config()?.cookie_max_age_seconds(), 120);
        Ok(())
    }

    #[test]
    fn debug_hides_admin_emails() {
        let config = GateConfig::new("boss@x.com".to_string());
        assert!(!format!("{config:?}").contains("boss@x.com"));
    }

    #[test]
    fn admin_gate_uses_configured_list() {
        let gate = GateConfig::new("a@x.com".to_string()).admin_gate();
        assert_eq!(gate.allow_list().len(), 1);
        let identity = RequestIdentity::authenticated("u1", "a@x.com");
        assert!(gate.is_admin(Some(&identity)));
    }
}
