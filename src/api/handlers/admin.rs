//! Admin back-office loaders.
//!
//! Everything here sits behind the admin gate middleware; handlers receive
//! the admitted identity through [`AdminUser`]. The diagnostic page is the
//! one bypassed route and must not assume an admin caller.

use super::{
    soft_list,
    types::{
        AdminDashboardPage, AdminForumsPage, AdminStats, AdminUsersPage, DebugPage, PageData,
    },
};
use crate::gate::{csrf, AdminGate, AdminUser, CsrfConfig, CsrfToken, CurrentIdentity, GateError};
use crate::services::{ForumStore, ProfileStore};
use axum::{
    extract::{Extension, Path},
    http::{header::LOCATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const ADMIN_FORUMS_PATH: &str = "/admin/forums";

pub async fn dashboard(
    AdminUser(user): AdminUser,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    Extension(profiles): Extension<Arc<dyn ProfileStore>>,
    token: CsrfToken,
) -> impl IntoResponse {
    let (users, topics, categories) = tokio::join!(
        profiles.list_profiles(),
        forum.list_topics(),
        forum.list_categories()
    );

    let mut error = None;
    let users = soft_list(users, "users", &mut error);
    let topics = soft_list(topics, "topics", &mut error);
    let categories = soft_list(categories, "categories", &mut error);

    let stats = AdminStats {
        users: users.len(),
        topics: topics.len(),
        pinned_topics: topics.iter().filter(|topic| topic.is_pinned).count(),
        categories: categories.len(),
    };

    PageData::json(&token, AdminDashboardPage { user, stats, error })
}

pub async fn users(
    AdminUser(user): AdminUser,
    Extension(profiles): Extension<Arc<dyn ProfileStore>>,
    token: CsrfToken,
) -> impl IntoResponse {
    let mut error = None;
    let users = soft_list(profiles.list_profiles().await, "users", &mut error);

    PageData::json(&token, AdminUsersPage { user, users, error })
}

pub async fn forums(
    AdminUser(user): AdminUser,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    token: CsrfToken,
) -> impl IntoResponse {
    let (topics, categories) = tokio::join!(forum.list_topics(), forum.list_categories());

    let mut error = None;
    let topics = soft_list(topics, "topics", &mut error);
    let categories = soft_list(categories, "categories", &mut error);

    PageData::json(
        &token,
        AdminForumsPage {
            user,
            topics,
            categories,
            error,
        },
    )
}

/// Diagnostic page, reachable without admin rights.
pub async fn debug(
    current: CurrentIdentity,
    Extension(gate): Extension<Arc<AdminGate>>,
    Extension(csrf_config): Extension<Arc<CsrfConfig>>,
    token: CsrfToken,
) -> impl IntoResponse {
    let user = current.authenticated().cloned();

    PageData::json(
        &token,
        DebugPage {
            is_admin: gate.is_admin(user.as_ref()),
            user,
            allow_list_configured: !gate.allow_list().is_empty(),
            csrf_cookie_secure: csrf_config.secure(),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct PinForm {
    /// Falls back to the `X-CSRF-Token` header when absent.
    csrf_token: Option<String>,
    #[serde(default)]
    pinned: bool,
}

/// Form action: pin or unpin a topic, then return to the forum list.
pub async fn pin_topic(
    AdminUser(user): AdminUser,
    Path(id): Path<String>,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    headers: HeaderMap,
    Form(form): Form<PinForm>,
) -> Result<Response, GateError> {
    csrf::verify_form(&headers, form.csrf_token.as_deref())?;

    if !forum.set_pinned(&id, form.pinned).await? {
        return Err(GateError::NotFound("topic"));
    }
    info!(uid = %user.uid, topic = %id, pinned = form.pinned, "topic pin updated");

    Ok((StatusCode::SEE_OTHER, [(LOCATION, ADMIN_FORUMS_PATH)]).into_response())
}
