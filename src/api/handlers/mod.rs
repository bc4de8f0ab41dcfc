//! Route loaders.
//!
//! Page loaders return JSON page data carrying the request's CSRF token.
//! List loaders soft-fail: a collaborator error is logged and the page is
//! still served with an empty list and an `error` message.

pub mod admin;
pub mod csrf;
pub mod forum_api;
pub mod health;
pub mod pages;
pub mod types;

use tracing::error;

/// Unwrap a list result, recording a user-facing message on failure.
pub(crate) fn soft_list<T>(
    result: anyhow::Result<Vec<T>>,
    what: &str,
    message: &mut Option<String>,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(err) => {
            error!("Failed to load {what}: {err:#}");
            message.get_or_insert_with(|| format!("Failed to load {what}"));
            Vec::new()
        }
    }
}
