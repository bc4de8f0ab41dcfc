//! Shared response shapes for the page loaders.

use crate::gate::{CsrfToken, RequestIdentity};
use crate::services::{ForumCategory, ForumTopic, UserProfile};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Loader payload: the route data plus the request's CSRF token, so every
/// rendered form can submit it back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    pub csrf_token: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> PageData<T> {
    pub fn json(token: &CsrfToken, data: T) -> Json<Self> {
        Json(Self {
            csrf_token: token.expose().to_string(),
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub user: Option<RequestIdentity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumsPage {
    pub topics: Vec<ForumTopic>,
    pub categories: Vec<ForumCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ForumCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicPage {
    pub topic: ForumTopic,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub user: RequestIdentity,
    pub profile: UserProfile,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: usize,
    pub topics: usize,
    pub pinned_topics: usize,
    pub categories: usize,
}

#[derive(Debug, Serialize)]
pub struct AdminDashboardPage {
    pub user: RequestIdentity,
    pub stats: AdminStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminUsersPage {
    pub user: RequestIdentity,
    pub users: Vec<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminForumsPage {
    pub user: RequestIdentity,
    pub topics: Vec<ForumTopic>,
    pub categories: Vec<ForumCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Gate diagnostics. Never includes allow-list entries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugPage {
    pub user: Option<RequestIdentity>,
    pub is_admin: bool,
    pub allow_list_configured: bool,
    pub csrf_cookie_secure: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CsrfTokenResponse {
    pub token: String,
}
