//! CSRF double-submit cookie.
//!
//! Issuance: every request ends up with a token. An existing non-empty
//! `csrf_token` cookie is reused as-is; otherwise a fresh token is generated
//! and the response carries exactly one `Set-Cookie` for it.
//!
//! Verification: state-changing requests must echo the cookie value in the
//! `X-CSRF-Token` header (or the `csrf_token` form field for form posts).
//! Tokens are never stored server-side.

use super::{cookies::cookie_value, error::GateError};
use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{
        header::{HeaderName, InvalidHeaderValue},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

pub const CSRF_COOKIE_NAME: &str = "csrf_token";
pub const CSRF_HEADER: HeaderName = HeaderName::from_static("x-csrf-token");
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Raw entropy per token; 43 characters once encoded.
pub const TOKEN_BYTES: usize = 32;
pub const DEFAULT_COOKIE_MAX_AGE_SECONDS: u64 = 86_400;

/// Opaque anti-forgery token.
#[derive(Clone)]
pub struct CsrfToken(SecretString);

impl CsrfToken {
    /// Generate a new token from the OS RNG.
    ///
    /// # Errors
    /// Returns [`GateError::TokenGeneration`] if the RNG is unavailable.
    pub fn generate() -> Result<Self, GateError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(GateError::TokenGeneration)?;
        Ok(Self::from(Base64UrlUnpadded::encode_string(&bytes)))
    }

    /// Token carried by the request cookie, if present and non-empty.
    #[must_use]
    pub fn from_cookie(headers: &HeaderMap) -> Option<Self> {
        cookie_value(headers, CSRF_COOKIE_NAME)
            .filter(|value| !value.is_empty())
            .map(Self::from)
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Header form of the token for the `X-CSRF-Token` mirror.
    ///
    /// # Errors
    /// Fails if a cookie-supplied token contains bytes invalid in a header.
    pub fn header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(self.expose())
    }
}

impl From<String> for CsrfToken {
    fn from(value: String) -> Self {
        Self(SecretString::from(value))
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken([REDACTED])")
    }
}

impl PartialEq for CsrfToken {
    fn eq(&self, other: &Self) -> bool {
        tokens_match(self.expose(), other.expose())
    }
}

impl Eq for CsrfToken {}

/// Constant-time comparison over fixed-length digests so neither content
/// nor length leaks through timing. Empty values never match.
#[must_use]
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || provided.is_empty() {
        return false;
    }
    let expected = Sha256::digest(expected.as_bytes());
    let provided = Sha256::digest(provided.as_bytes());
    bool::from(expected.ct_eq(&provided))
}

/// Cookie attributes for issued tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrfConfig {
    secure: bool,
    cookie_max_age_seconds: u64,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            secure: false,
            cookie_max_age_seconds: DEFAULT_COOKIE_MAX_AGE_SECONDS,
        }
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_cookie_max_age_seconds(mut self, seconds: u64) -> Self {
        self.cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn cookie_max_age_seconds(&self) -> u64 {
        self.cookie_max_age_seconds
    }

    /// Build the `Set-Cookie` value persisting `token`.
    ///
    /// # Errors
    /// Fails if the token contains bytes invalid in a header.
    pub fn cookie(&self, token: &CsrfToken) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{CSRF_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            token.expose(),
            self.cookie_max_age_seconds
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Result of issuance for one request.
#[derive(Clone, Debug)]
pub struct Issued {
    pub token: CsrfToken,
    /// True when the token was generated for this request and must be
    /// persisted with `Set-Cookie`.
    pub fresh: bool,
}

/// Reuse the cookie token or generate a fresh one.
///
/// # Errors
/// Returns [`GateError::TokenGeneration`] if a new token cannot be generated.
pub fn issue(headers: &HeaderMap) -> Result<Issued, GateError> {
    match CsrfToken::from_cookie(headers) {
        Some(token) => Ok(Issued { token, fresh: false }),
        None => Ok(Issued {
            token: CsrfToken::generate()?,
            fresh: true,
        }),
    }
}

/// Verify the `X-CSRF-Token` header against the cookie.
///
/// # Errors
/// Returns [`GateError::Forbidden`] on a missing cookie, a missing or empty
/// header, or a mismatch.
pub fn verify(headers: &HeaderMap) -> Result<(), GateError> {
    let submitted = headers
        .get(&CSRF_HEADER)
        .and_then(|value| value.to_str().ok());
    verify_submitted(headers, submitted)
}

/// Verify a token submitted out of band (e.g. a form field) against the
/// cookie.
///
/// # Errors
/// Returns [`GateError::Forbidden`] when the token is absent or does not match.
pub fn verify_submitted(headers: &HeaderMap, submitted: Option<&str>) -> Result<(), GateError> {
    let Some(cookie) = CsrfToken::from_cookie(headers) else {
        return Err(GateError::Forbidden);
    };
    let submitted = submitted.map(str::trim).unwrap_or_default();
    if tokens_match(cookie.expose(), submitted) {
        Ok(())
    } else {
        Err(GateError::Forbidden)
    }
}

/// Verify a form post: the `csrf_token` field when present, otherwise the
/// `X-CSRF-Token` header.
///
/// # Errors
/// Returns [`GateError::Forbidden`] when neither carries the cookie token.
pub fn verify_form(headers: &HeaderMap, field: Option<&str>) -> Result<(), GateError> {
    match field.map(str::trim).filter(|value| !value.is_empty()) {
        Some(submitted) => verify_submitted(headers, Some(submitted)),
        None => verify(headers),
    }
}

/// Response extension set by handlers that rotate the token; the issuance
/// layer persists it in place of the request token.
#[derive(Clone, Debug)]
pub struct RotatedCsrfToken(pub CsrfToken);

#[async_trait]
impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| GateError::Service(anyhow!("CSRF issuance layer is not installed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("{CSRF_COOKIE_NAME}={value}")) {
            headers.insert(COOKIE, value);
        }
        headers
    }

    #[test]
    fn generated_tokens_carry_full_entropy() -> anyhow::Result<()> {
        let token = CsrfToken::generate()?;
        let decoded = Base64UrlUnpadded::decode_vec(token.expose())
            .map_err(|err| anyhow!("decode: {err}"))?;
        assert_eq!(decoded.len(), TOKEN_BYTES);
        assert_eq!(token.expose().len(), 43);
        Ok(())
    }

    #[test]
    fn generated_tokens_differ() -> anyhow::Result<()> {
        let first = CsrfToken::generate()?;
        let second = CsrfToken::generate()?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn debug_is_redacted() -> anyhow::Result<()> {
        let token = CsrfToken::generate()?;
        let rendered = format!("{token:?}");
        assert!(!rendered.contains(token.expose()));
        Ok(())
    }

    #[test]
    fn issue_reuses_existing_cookie() -> anyhow::Result<()> {
        let issued = issue(&with_cookie("existing-token"))?;
        assert!(!issued.fresh);
        assert_eq!(issued.token.expose(), "existing-token");
        Ok(())
    }

    #[test]
    fn issue_is_idempotent_across_requests() -> anyhow::Result<()> {
        let first = issue(&HeaderMap::new())?;
        assert!(first.fresh);
        let headers = with_cookie(first.token.expose());
        for _ in 0..3 {
            let again = issue(&headers)?;
            assert!(!again.fresh);
            assert_eq!(again.token, first.token);
        }
        Ok(())
    }

    #[test]
    fn issue_replaces_empty_cookie() -> anyhow::Result<()> {
        let issued = issue(&with_cookie("  "))?;
        assert!(issued.fresh);
        assert!(!issued.token.expose().is_empty());
        Ok(())
    }

    #[test]
    fn cookie_attributes() -> anyhow::Result<()> {
        let token = CsrfToken::from("abc".to_string());
        let cookie = CsrfConfig::new().cookie(&token)?;
        assert_eq!(
            cookie.to_str()?,
            "csrf_token=abc; Path=/; HttpOnly; SameSite=Strict; Max-Age=86400"
        );

        let secure = CsrfConfig::new()
            .with_secure(true)
            .with_cookie_max_age_seconds(60)
            .cookie(&token)?;
        assert_eq!(
            secure.to_str()?,
            "csrf_token=abc; Path=/; HttpOnly; SameSite=Strict; Max-Age=60; Secure"
        );
        Ok(())
    }

    #[test]
    fn verify_accepts_matching_header() -> anyhow::Result<()> {
        let mut headers = with_cookie("tok");
        headers.insert(CSRF_HEADER, HeaderValue::from_static("tok"));
        verify(&headers)?;
        Ok(())
    }

    #[test]
    fn verify_rejects_missing_empty_or_mismatched() {
        let missing_header = with_cookie("tok");
        assert!(matches!(verify(&missing_header), Err(GateError::Forbidden)));

        let mut empty_header = with_cookie("tok");
        empty_header.insert(CSRF_HEADER, HeaderValue::from_static(""));
        assert!(matches!(verify(&empty_header), Err(GateError::Forbidden)));

        let mut mismatch = with_cookie("tok");
        mismatch.insert(CSRF_HEADER, HeaderValue::from_static("other"));
        assert!(matches!(verify(&mismatch), Err(GateError::Forbidden)));

        let mut no_cookie = HeaderMap::new();
        no_cookie.insert(CSRF_HEADER, HeaderValue::from_static("tok"));
        assert!(matches!(verify(&no_cookie), Err(GateError::Forbidden)));
    }

    #[test]
    fn verify_submitted_checks_form_value() {
        let headers = with_cookie("tok");
        assert!(verify_submitted(&headers, Some("tok")).is_ok());
        assert!(verify_submitted(&headers, Some("nope")).is_err());
        assert!(verify_submitted(&headers, None).is_err());
    }

    #[test]
    fn verify_form_falls_back_to_header() {
        let mut headers = with_cookie("tok");
        assert!(verify_form(&headers, None).is_err());

        headers.insert(CSRF_HEADER, HeaderValue::from_static("tok"));
        assert!(verify_form(&headers, None).is_ok());
        assert!(verify_form(&headers, Some("")).is_ok());
        // A present field is authoritative even when the header matches.
        assert!(verify_form(&headers, Some("nope")).is_err());
    }

    #[test]
    fn tokens_match_rejects_empty() {
        assert!(!tokens_match("", ""));
        assert!(!tokens_match("a", ""));
        assert!(tokens_match("a", "a"));
        assert!(!tokens_match("a", "ab"));
    }
}
