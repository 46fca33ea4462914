//! Persistence seams for the user, post and comment aggregates.
//!
//! Every aggregate is reached through a trait object so the services never
//! touch a connection directly. `sql` backs the traits with PostgreSQL via
//! SeaORM, `memory` with process-local maps.

pub mod memory;
pub mod sql;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media::MediaType;
use sea_orm::{DbErr, FromQueryResult, SqlErr};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A unique column (username, email) already holds the value.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("datastore error: {0}")]
    Backend(String),
}

impl From<DbErr> for RepoError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => RepoError::Conflict(detail),
            _ => RepoError::Backend(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub bio: String,
    pub profile_image: String,
    pub total_likes_received: i64,
    /// Authored post ids in the order they were appended.
    pub posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: String,
    pub profile_image: String,
}

/// Fields a user may change on their own profile. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct UserProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct LeaderboardRow {
    pub username: String,
    pub total_likes_received: i64,
    pub profile_image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub caption: String,
    pub author: String,
    pub user_id: Uuid,
    pub media_url: String,
    pub media_type: MediaType,
    /// User ids, each at most once, in the order the likes arrived.
    pub likes: Vec<Uuid>,
    pub likes_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub caption: String,
    pub author: String,
    pub user_id: Uuid,
    pub media_url: String,
    pub media_type: MediaType,
}

/// The writable part of a post.
#[derive(Debug, Clone)]
pub struct PostContent {
    pub title: String,
    pub caption: String,
    pub media_url: String,
    pub media_type: MediaType,
}

/// What the post table says about one author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorSummary {
    pub post_ids: Vec<Uuid>,
    /// Sum of `likes_count` over those posts.
    pub likes_held: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
    async fn update_profile(
        &self,
        id: Uuid,
        patch: UserProfilePatch,
    ) -> Result<Option<UserRecord>, RepoError>;
    /// Returns `false` when no such user exists.
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Append `post_id` to the user's `posts` unless already present.
    /// Returns `false` when the user does not exist.
    async fn push_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;
    /// Returns `true` when the id was present and has been removed.
    async fn pull_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError>;

    /// Add `delta` to `totalLikesReceived` atomically, flooring the result at 0.
    /// Returns the new total, or `None` when the user does not exist.
    async fn adjust_likes_received(&self, user_id: Uuid, delta: i64)
    -> Result<Option<i64>, RepoError>;

    /// Highest `totalLikesReceived` first; equal totals by account age.
    async fn leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardRow>, RepoError>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: NewPost) -> Result<PostRecord, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
    /// Newest first, optionally restricted to one author.
    async fn list(
        &self,
        author: Option<Uuid>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<PostRecord>, RepoError>;
    async fn replace_content(
        &self,
        id: Uuid,
        content: PostContent,
    ) -> Result<Option<PostRecord>, RepoError>;
    /// Deletes the post and its likes. Returns `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;

    /// "Add if absent". Returns `true` when the like was inserted, `false`
    /// when it already existed or the post is gone.
    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;
    /// "Remove if present". Returns `true` when a like was removed.
    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError>;
    /// Recompute `likes_count` from the stored likes and return the post.
    async fn refresh_likes_count(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn author_summary(&self, user_id: Uuid) -> Result<AuthorSummary, RepoError>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: NewComment) -> Result<CommentRecord, RepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;
    /// Newest first.
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;
}
