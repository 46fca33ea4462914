use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::{UserProfilePatch, UserRecord};
use crate::services::user::{RankedUser, Reconciliation, Registration};

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Unique username (3-32 chars: letters, digits, `_`, `.`).
    #[schema(example = "alice")]
    pub username: String,
    /// Unique email address.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password (6-128 characters).
    #[schema(example = "correct horse")]
    pub password: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            bio: req.bio,
            profile_image: req.profile_image,
        }
    }
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "correct horse")]
    pub password: String,
}

/// Profile patch. Omitted fields are left unchanged.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
}

impl From<UpdateUserRequest> for UserProfilePatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            bio: req.bio,
            profile_image: req.profile_image,
        }
    }
}

/// A user without credentials.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub bio: String,
    pub profile_image: String,
    #[schema(example = 42)]
    pub total_likes_received: i64,
    /// Ids of authored posts.
    pub posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            bio: user.bio,
            profile_image: user.profile_image,
            total_likes_received: user.total_likes_received,
            posts: user.posts,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Number of entries. Default: 50, max: 100.
    pub limit: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position; equal totals still get distinct ranks.
    #[schema(example = 1)]
    pub rank: u64,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = 50)]
    pub total_likes_received: i64,
    pub profile_image: String,
}

impl From<RankedUser> for LeaderboardEntry {
    fn from(r: RankedUser) -> Self {
        Self {
            rank: r.rank,
            username: r.username,
            total_likes_received: r.total_likes_received,
            profile_image: r.profile_image,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub user_id: Uuid,
    /// Post ids that were missing from the user's list and have been added.
    pub added: Vec<Uuid>,
    /// Stale ids that have been removed.
    pub removed: Vec<Uuid>,
    pub posts: Vec<Uuid>,
    pub total_likes_received: i64,
    /// Likes currently held by the user's posts.
    pub likes_held: i64,
}

impl From<Reconciliation> for ReconcileResponse {
    fn from(r: Reconciliation) -> Self {
        Self {
            user_id: r.user_id,
            added: r.added,
            removed: r.removed,
            posts: r.posts,
            total_likes_received: r.total_likes_received,
            likes_held: r.likes_held,
        }
    }
}
