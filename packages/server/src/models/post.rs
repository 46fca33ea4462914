use chrono::{DateTime, Utc};
use media::MediaType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::PaginationMeta;
use crate::repository::PostRecord;
use crate::services::post::LikeOutcome;

/// Request body for creating a post. `mediaUrl` comes from `POST /upload`.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[schema(example = "Sunset at the pier")]
    pub title: String,
    #[schema(example = "Golden hour never disappoints")]
    pub caption: String,
    /// Display name. Defaults to the caller's username.
    #[schema(example = "alice")]
    pub author: Option<String>,
    #[schema(example = "https://cdn.example.com/images/1718000000000_sunset.jpg")]
    pub media_url: String,
    /// Defaults to `image`.
    pub media_type: Option<MediaType>,
}

/// Request body for replacing a post's content.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub title: String,
    pub caption: String,
    pub media_url: String,
    /// Keeps the current type when omitted.
    pub media_type: Option<MediaType>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub author: String,
    pub user_id: Uuid,
    pub media_url: String,
    pub media_type: MediaType,
    /// Ids of users who liked the post.
    pub likes: Vec<Uuid>,
    /// Always equals `likes.length`.
    #[schema(example = 3)]
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRecord> for PostResponse {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title,
            caption: post.caption,
            author: post.author,
            user_id: post.user_id,
            media_url: post.media_url,
            media_type: post.media_type,
            likes: post.likes,
            likes_count: post.likes_count,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PostListData {
    pub posts: Vec<PostResponse>,
    pub pagination: PaginationMeta,
}

/// The post after a like toggle, with the author's updated total.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    /// Whether the caller now likes the post.
    pub liked: bool,
    #[schema(example = 42)]
    pub author_total_likes: i64,
}

impl From<LikeOutcome> for LikeResponse {
    fn from(outcome: LikeOutcome) -> Self {
        Self {
            post: outcome.post.into(),
            liked: outcome.liked,
            author_total_likes: outcome.author_total_likes,
        }
    }
}
