//! # LearnFlow request gate
//!
//! `learnflow` serves the page data for the LearnFlow course and forum site
//! behind two guards:
//!
//! - **Admin gate:** every `/admin` route is permitted only for an
//!   authenticated caller whose email is in the configured allow-list
//!   (`LEARNFLOW_ADMIN_EMAILS`). Denied requests are redirected to `/`. The
//!   diagnostic page `/admin/debug` is the single exact-path exception.
//! - **CSRF protection:** a double-submit token lives in the `csrf_token`
//!   cookie (`HttpOnly`, `SameSite=Strict`). It is issued on first visit,
//!   mirrored to loaders and the `X-CSRF-Token` response header, and must be
//!   echoed back on every state-changing `/api` call.
//!
//! The caller identity is resolved once per request from a bearer token or
//! the `learnflow_session` cookie. Data stores sit behind the traits in
//! [`services`].

pub mod api;
pub mod cli;
pub mod gate;
pub mod services;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
