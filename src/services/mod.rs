//! Data collaborators behind the page loaders.
//!
//! Loaders only rely on these call contracts; the shipped implementation is
//! [`postgres::PgStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod postgres;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForumTopic {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub category_id: String,
    pub tags: Vec<String>,
    pub created_at_unix: i64,
    pub views: i64,
    pub post_count: i64,
    pub is_pinned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForumCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub topic_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Topic submitted through the forum API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub title: String,
    pub content: String,
    pub category_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Filled from the caller identity, never from the request body.
    #[serde(skip_deserializing)]
    pub author_id: String,
}

#[async_trait]
pub trait ForumStore: Send + Sync {
    /// Pinned topics first, then newest.
    async fn list_topics(&self) -> anyhow::Result<Vec<ForumTopic>>;

    async fn list_categories(&self) -> anyhow::Result<Vec<ForumCategory>>;

    async fn get_category(&self, id: &str) -> anyhow::Result<Option<ForumCategory>>;

    async fn get_topic(&self, id: &str) -> anyhow::Result<Option<ForumTopic>>;

    async fn create_topic(&self, topic: NewTopic) -> anyhow::Result<ForumTopic>;

    /// Returns `false` when the topic does not exist.
    async fn set_pinned(&self, id: &str, pinned: bool) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn list_profiles(&self) -> anyhow::Result<Vec<UserProfile>>;

    async fn get_profile(&self, uid: &str) -> anyhow::Result<Option<UserProfile>>;
}
