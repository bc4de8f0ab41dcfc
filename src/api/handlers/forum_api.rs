//! JSON API for authenticated callers.
//!
//! Requests reach these handlers only after CSRF verification and the
//! require-identity layer.

use crate::gate::{CurrentIdentity, GateError, RequestIdentity};
use crate::services::{ForumStore, ForumTopic, NewTopic};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, instrument};

pub const MAX_TITLE_CHARS: usize = 200;

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The authenticated caller", body = RequestIdentity),
        (status = 401, description = "No authenticated session"),
    ),
    tag = "forum"
)]
pub async fn me(current: CurrentIdentity) -> Result<Json<RequestIdentity>, GateError> {
    current
        .authenticated()
        .cloned()
        .map(Json)
        .ok_or(GateError::Unauthenticated)
}

fn validate(topic: &NewTopic) -> Result<(), GateError> {
    let title = topic.title.trim();
    if title.is_empty() {
        return Err(GateError::BadRequest("title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(GateError::BadRequest(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    if topic.content.trim().is_empty() {
        return Err(GateError::BadRequest("content is required".to_string()));
    }
    if topic.category_id.trim().is_empty() {
        return Err(GateError::BadRequest("categoryId is required".to_string()));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/forum/topics",
    request_body = NewTopic,
    params(
        ("X-CSRF-Token" = String, Header, description = "Must equal the csrf_token cookie"),
    ),
    responses(
        (status = 201, description = "Topic created", body = ForumTopic),
        (status = 400, description = "Invalid topic"),
        (status = 401, description = "No authenticated session"),
        (status = 403, description = "CSRF token validation failed"),
        (status = 404, description = "Category not found"),
    ),
    tag = "forum"
)]
#[instrument(skip_all)]
pub async fn create_topic(
    current: CurrentIdentity,
    Extension(forum): Extension<Arc<dyn ForumStore>>,
    Json(mut topic): Json<NewTopic>,
) -> Result<Response, GateError> {
    let author = current
        .authenticated()
        .ok_or(GateError::Unauthenticated)?;

    validate(&topic)?;
    topic.title = topic.title.trim().to_string();
    topic.category_id = topic.category_id.trim().to_string();

    // Unknown or malformed category ids never reach the insert.
    if forum.get_category(&topic.category_id).await?.is_none() {
        return Err(GateError::NotFound("category"));
    }
    topic.author_id.clone_from(&author.uid);

    let created = forum.create_topic(topic).await?;
    info!(uid = %author.uid, topic = %created.id, "forum topic created");

    Ok((StatusCode::CREATED, Json(created)).into_response())
}
