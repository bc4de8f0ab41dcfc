//! Public page loaders.

use super::{
    soft_list,
    types::{ForumsPage, HomePage, PageData, ProfilePage, TopicPage},
};
use crate::gate::{CsrfToken, CurrentIdentity, GateError};
use crate::services::{ForumStore, ProfileStore};
use axum::{
    extract::{Extension, Path},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

pub const LOGIN_REDIRECT: &str = "/login?returnTo=/profile";

pub async fn home(current: CurrentIdentity, token: CsrfToken) -> impl IntoResponse {
    PageData::json(
        &token,
        HomePage {
            user: current.authenticated().cloned(),
        },
    )
}

pub async fn forums(
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    token: CsrfToken,
) -> impl IntoResponse {
    let (topics, categories) = tokio::join!(forum.list_topics(), forum.list_categories());

    let mut error = None;
    let page = ForumsPage {
        topics: soft_list(topics, "topics", &mut error),
        categories: soft_list(categories, "categories", &mut error),
        selected_tag: None,
        category: None,
        error,
    };

    PageData::json(&token, page)
}

#[instrument(skip(forum, token))]
pub async fn forums_by_tag(
    Path(tag): Path<String>,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    token: CsrfToken,
) -> impl IntoResponse {
    let (topics, categories) = tokio::join!(forum.list_topics(), forum.list_categories());

    let mut error = None;
    let topics = soft_list(topics, "topics", &mut error)
        .into_iter()
        .filter(|topic| topic.tags.iter().any(|candidate| candidate == &tag))
        .collect();
    let page = ForumsPage {
        topics,
        categories: soft_list(categories, "categories", &mut error),
        selected_tag: Some(tag),
        category: None,
        error,
    };

    PageData::json(&token, page)
}

#[instrument(skip(forum, token))]
pub async fn forums_by_category(
    Path(id): Path<String>,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    token: CsrfToken,
) -> Result<Response, GateError> {
    let category = forum
        .get_category(&id)
        .await?
        .ok_or(GateError::NotFound("category"))?;

    let (topics, categories) = tokio::join!(forum.list_topics(), forum.list_categories());

    let mut error = None;
    let topics = soft_list(topics, "topics", &mut error)
        .into_iter()
        .filter(|topic| topic.category_id == category.id)
        .collect();
    let page = ForumsPage {
        topics,
        categories: soft_list(categories, "categories", &mut error),
        selected_tag: None,
        category: Some(category),
        error,
    };

    Ok(PageData::json(&token, page).into_response())
}

#[instrument(skip(forum, token))]
pub async fn topic(
    Path(id): Path<String>,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    token: CsrfToken,
) -> Result<Response, GateError> {
    let topic = forum
        .get_topic(&id)
        .await?
        .ok_or(GateError::NotFound("topic"))?;

    Ok(PageData::json(&token, TopicPage { topic }).into_response())
}

/// Own profile; anonymous visitors are sent to the login page.
pub async fn profile(
    current: CurrentIdentity,
    Extension(profiles): Extension<Arc<dyn ProfileStore>>,
    token: CsrfToken,
) -> Result<Response, GateError> {
    let Some(user) = current.authenticated().cloned() else {
        return Ok((StatusCode::FOUND, [(LOCATION, LOGIN_REDIRECT)]).into_response());
    };

    let profile = profiles
        .get_profile(&user.uid)
        .await?
        .ok_or(GateError::NotFound("profile"))?;

    Ok(PageData::json(&token, ProfilePage { user, profile }).into_response())
}
