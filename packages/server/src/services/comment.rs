use tracing::info;
use uuid::Uuid;

use super::require_len;
use crate::error::AppError;
use crate::repository::{CommentRecord, CommentRepository, NewComment};

pub const MAX_COMMENT_LEN: usize = 2000;

pub struct CommentService<'a> {
    comments: &'a dyn CommentRepository,
}

impl<'a> CommentService<'a> {
    pub fn new(comments: &'a dyn CommentRepository) -> Self {
        Self { comments }
    }

    /// Comments on a post, newest first.
    pub async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, AppError> {
        Ok(self.comments.list_by_post(post_id).await?)
    }

    /// Neither `post_id` nor `user_id` is checked for existence.
    pub async fn create(
        &self,
        post_id: Uuid,
        content: &str,
        user_id: Uuid,
        username: &str,
    ) -> Result<CommentRecord, AppError> {
        require_len("Content", content, 1, MAX_COMMENT_LEN)?;
        require_len("Username", username, 1, usize::MAX)?;

        let comment = self
            .comments
            .insert(NewComment {
                content: content.trim().to_string(),
                post_id,
                user_id,
                username: username.to_string(),
            })
            .await?;

        info!(comment_id = %comment.id, post_id = %post_id, "Comment created");
        Ok(comment)
    }

    /// Authors only.
    pub async fn delete(&self, id: Uuid, requester: Uuid) -> Result<(), AppError> {
        let comment = self
            .comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;

        if comment.user_id != requester {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".into(),
            ));
        }

        self.comments.delete(id).await?;
        info!(comment_id = %id, "Comment deleted");
        Ok(())
    }
}
