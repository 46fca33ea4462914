use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::CommentRecord;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    /// 1-2000 characters after trimming.
    #[schema(example = "Love the colours!")]
    pub content: String,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "bob")]
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRecord> for CommentResponse {
    fn from(c: CommentRecord) -> Self {
        Self {
            id: c.id,
            content: c.content,
            post_id: c.post_id,
            user_id: c.user_id,
            username: c.username,
            created_at: c.created_at,
        }
    }
}
