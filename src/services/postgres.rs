//! Postgres-backed collaborators.
//!
//! Flow Overview: one pool shared by the forum store, the profile store and
//! the session resolver. Ids cross the boundary as strings; malformed ids are
//! treated as "not found" rather than errors.

use super::{ForumCategory, ForumStore, ForumTopic, NewTopic, ProfileStore, UserProfile};
use crate::gate::{
    cookies::{bearer_token, cookie_value},
    IdentityResolver, RequestIdentity,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "learnflow_session";

const TOPIC_COLUMNS: &str = r"
    forum_topics.id::text AS id,
    forum_topics.title,
    forum_topics.content,
    forum_topics.author_id::text AS author_id,
    users.display_name AS author_name,
    forum_topics.category_id::text AS category_id,
    forum_topics.tags,
    EXTRACT(EPOCH FROM forum_topics.created_at)::BIGINT AS created_at_unix,
    forum_topics.views,
    forum_topics.post_count,
    forum_topics.is_pinned
";

const CATEGORY_SELECT: &str = r"
    SELECT forum_categories.id::text AS id,
           forum_categories.name,
           forum_categories.description,
           COUNT(forum_topics.id)::BIGINT AS topic_count
    FROM forum_categories
    LEFT JOIN forum_topics ON forum_topics.category_id = forum_categories.id
";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Session tokens are stored hashed; raw values never reach the database.
#[must_use]
pub fn hash_session_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| {
        cookie_value(headers, SESSION_COOKIE_NAME).filter(|value| !value.is_empty())
    })
}

fn topic_from_row(row: &PgRow) -> ForumTopic {
    ForumTopic {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        category_id: row.get("category_id"),
        tags: row.get("tags"),
        created_at_unix: row.get("created_at_unix"),
        views: row.get("views"),
        post_count: row.get("post_count"),
        is_pinned: row.get("is_pinned"),
    }
}

fn category_from_row(row: &PgRow) -> ForumCategory {
    ForumCategory {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        topic_count: row.get("topic_count"),
    }
}

fn profile_from_row(row: &PgRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        photo_url: row.get("photo_url"),
    }
}

#[async_trait]
impl ForumStore for PgStore {
    async fn list_topics(&self) -> Result<Vec<ForumTopic>> {
        let query = format!(
            "SELECT {TOPIC_COLUMNS} FROM forum_topics \
             LEFT JOIN users ON users.id = forum_topics.author_id \
             ORDER BY forum_topics.is_pinned DESC, forum_topics.created_at DESC"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to list forum topics")?;

        Ok(rows.iter().map(topic_from_row).collect())
    }

    async fn list_categories(&self) -> Result<Vec<ForumCategory>> {
        let query = format!(
            "{CATEGORY_SELECT} GROUP BY forum_categories.id ORDER BY forum_categories.name"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to list forum categories")?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn get_category(&self, id: &str) -> Result<Option<ForumCategory>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let query = format!(
            "{CATEGORY_SELECT} WHERE forum_categories.id = $1 GROUP BY forum_categories.id"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to load forum category")?;

        Ok(row.as_ref().map(category_from_row))
    }

    async fn get_topic(&self, id: &str) -> Result<Option<ForumTopic>> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let query = format!(
            "SELECT {TOPIC_COLUMNS} FROM forum_topics \
             LEFT JOIN users ON users.id = forum_topics.author_id \
             WHERE forum_topics.id = $1"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to load forum topic")?;

        Ok(row.as_ref().map(topic_from_row))
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<ForumTopic> {
        let author_id = Uuid::parse_str(&topic.author_id).context("invalid author id")?;
        let category_id = Uuid::parse_str(&topic.category_id).context("invalid category id")?;

        let query = r"
            INSERT INTO forum_topics (title, content, author_id, category_id, tags)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id::text AS id,
                      EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at_unix
        ";
        let row = sqlx::query(query)
            .bind(&topic.title)
            .bind(&topic.content)
            .bind(author_id)
            .bind(category_id)
            .bind(&topic.tags)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to create forum topic")?;

        Ok(ForumTopic {
            id: row.get("id"),
            title: topic.title,
            content: topic.content,
            author_id: topic.author_id,
            author_name: None,
            category_id: topic.category_id,
            tags: topic.tags,
            created_at_unix: row.get("created_at_unix"),
            views: 0,
            post_count: 0,
            is_pinned: false,
        })
    }

    async fn set_pinned(&self, id: &str, pinned: bool) -> Result<bool> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        let query = "UPDATE forum_topics SET is_pinned = $2, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(pinned)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update topic pin")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let query = r"
            SELECT id::text AS id, email, display_name, photo_url
            FROM users
            ORDER BY created_at DESC
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list users")?;

        Ok(rows.iter().map(profile_from_row).collect())
    }

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let Ok(uid) = Uuid::parse_str(uid) else {
            return Ok(None);
        };
        let query = "SELECT id::text AS id, email, display_name, photo_url FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(uid)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to load user profile")?;

        Ok(row.as_ref().map(profile_from_row))
    }
}

#[async_trait]
impl IdentityResolver for PgStore {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Option<RequestIdentity>> {
        let Some(token) = session_token(headers) else {
            return Ok(None);
        };
        let token_hash = hash_session_token(&token);

        // Only unexpired sessions resolve to an identity.
        let query = r"
            SELECT users.id::text AS id, users.email
            FROM user_sessions
            JOIN users ON users.id = user_sessions.user_id
            WHERE user_sessions.session_hash = $1
              AND user_sessions.expires_at > NOW()
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| {
            let uid: String = row.get("id");
            let email: String = row.get("email");
            RequestIdentity::authenticated(uid, email)
        }))
    }
}
