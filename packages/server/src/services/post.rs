use futures::future::join;
use media::MediaType;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::require_len;
use crate::error::AppError;
use crate::repository::{
    NewPost, Page, PostContent, PostRecord, PostRepository, RepoError, UserRepository,
};

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_CAPTION_LEN: usize = 2200;
pub const MAX_AUTHOR_LEN: usize = 64;
pub const MAX_MEDIA_URL_LEN: usize = 2048;

#[derive(Debug, Clone)]
pub struct CreatePost {
    pub title: String,
    pub caption: String,
    pub author: String,
    pub user_id: Uuid,
    pub media_url: String,
    /// Defaults to image.
    pub media_type: Option<MediaType>,
}

#[derive(Debug, Clone)]
pub struct UpdatePost {
    pub title: String,
    pub caption: String,
    pub media_url: String,
    pub media_type: Option<MediaType>,
}

/// Result of a like toggle, with the author's total after the change.
#[derive(Debug, Clone)]
pub struct LikeOutcome {
    pub post: PostRecord,
    pub liked: bool,
    pub author_total_likes: i64,
}

/// What the toggle did to the like set, so it can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SetChange {
    Added,
    Removed,
    /// A concurrent toggle by the same user already produced the target state.
    None,
}

impl SetChange {
    fn delta(self) -> i64 {
        match self {
            SetChange::Added => 1,
            SetChange::Removed => -1,
            SetChange::None => 0,
        }
    }
}

fn validate_content(
    title: &str,
    caption: &str,
    media_url: &str,
) -> Result<(), AppError> {
    require_len("Title", title, 1, MAX_TITLE_LEN)?;
    require_len("Caption", caption, 1, MAX_CAPTION_LEN)?;
    require_len("Media URL", media_url, 1, MAX_MEDIA_URL_LEN)?;
    Ok(())
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".into())
}

pub struct PostService<'a> {
    posts: &'a dyn PostRepository,
    users: &'a dyn UserRepository,
}

impl<'a> PostService<'a> {
    pub fn new(posts: &'a dyn PostRepository, users: &'a dyn UserRepository) -> Self {
        Self { posts, users }
    }

    /// Persist a post, then append its id to the owner's `posts`.
    ///
    /// The post exists once persisted; a failed append is logged and the
    /// back-reference can be rebuilt with `UserService::reconcile`.
    pub async fn create(&self, input: CreatePost) -> Result<PostRecord, AppError> {
        validate_content(&input.title, &input.caption, &input.media_url)?;
        require_len("Author", &input.author, 1, MAX_AUTHOR_LEN)?;

        if self.users.find_by_id(input.user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }

        let post = self
            .posts
            .insert(NewPost {
                title: input.title.trim().to_string(),
                caption: input.caption.trim().to_string(),
                author: input.author.trim().to_string(),
                user_id: input.user_id,
                media_url: input.media_url.trim().to_string(),
                media_type: input.media_type.unwrap_or_default(),
            })
            .await?;

        match self.users.push_post(post.user_id, post.id).await {
            Ok(true) => {}
            Ok(false) => warn!(
                post_id = %post.id,
                user_id = %post.user_id,
                "Owner disappeared before post id could be appended"
            ),
            Err(e) => error!(
                post_id = %post.id,
                user_id = %post.user_id,
                error = %e,
                "Failed to append post id to owner"
            ),
        }

        info!(post_id = %post.id, user_id = %post.user_id, "Post created");
        Ok(post)
    }

    pub async fn get_all(&self, page: u64, limit: u64) -> Result<Page<PostRecord>, AppError> {
        Ok(self.posts.list(None, page_offset(page, limit), limit).await?)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<PostRecord, AppError> {
        self.posts.find_by_id(id).await?.ok_or_else(post_not_found)
    }

    pub async fn get_by_author(
        &self,
        user_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<Page<PostRecord>, AppError> {
        Ok(self
            .posts
            .list(Some(user_id), page_offset(page, limit), limit)
            .await?)
    }

    /// Replace the writable fields of a post. Owner only.
    pub async fn update(
        &self,
        id: Uuid,
        requester: Uuid,
        input: UpdatePost,
    ) -> Result<PostRecord, AppError> {
        validate_content(&input.title, &input.caption, &input.media_url)?;

        let existing = self.get_by_id(id).await?;
        if existing.user_id != requester {
            return Err(AppError::Forbidden(
                "You can only edit your own posts".into(),
            ));
        }

        let content = PostContent {
            title: input.title.trim().to_string(),
            caption: input.caption.trim().to_string(),
            media_url: input.media_url.trim().to_string(),
            media_type: input.media_type.unwrap_or(existing.media_type),
        };
        self.posts
            .replace_content(id, content)
            .await?
            .ok_or_else(post_not_found)
    }

    /// Delete a post owned by `requester` and pull it from the owner's `posts`.
    pub async fn delete(&self, id: Uuid, requester: Uuid) -> Result<(), AppError> {
        let post = self.get_by_id(id).await?;
        if post.user_id != requester {
            return Err(AppError::Forbidden(
                "You can only delete your own posts".into(),
            ));
        }

        if !self.posts.delete(id).await? {
            return Err(post_not_found());
        }

        if let Err(e) = self.users.pull_post(post.user_id, id).await {
            error!(
                post_id = %id,
                user_id = %post.user_id,
                error = %e,
                "Failed to pull deleted post id from owner"
            );
        }

        info!(post_id = %id, "Post deleted");
        Ok(())
    }

    /// Flip `user_id`'s membership in the post's like set and move the
    /// author's `totalLikesReceived` by the same amount.
    ///
    /// The set change uses conditional remove/add, so concurrent toggles by
    /// different users never overwrite each other. The count refresh and the
    /// author adjustment run concurrently; if either fails the set change is
    /// reverted and the call fails.
    pub async fn toggle_like(&self, id: Uuid, user_id: Uuid) -> Result<LikeOutcome, AppError> {
        let post = self.get_by_id(id).await?;
        if self.users.find_by_id(post.user_id).await?.is_none() {
            return Err(AppError::NotFound("Post author not found".into()));
        }

        let change = if self.posts.remove_like(id, user_id).await? {
            SetChange::Removed
        } else if self.posts.add_like(id, user_id).await? {
            SetChange::Added
        } else {
            SetChange::None
        };

        let (refreshed, total) = join(
            self.posts.refresh_likes_count(id),
            self.author_total(post.user_id, change.delta()),
        )
        .await;

        match (refreshed, total) {
            (Ok(Some(post)), Ok(total)) => {
                let liked = post.likes.contains(&user_id);
                info!(post_id = %id, user_id = %user_id, liked, "Like toggled");
                Ok(LikeOutcome {
                    post,
                    liked,
                    author_total_likes: total.unwrap_or(0),
                })
            }
            (Ok(None), _) => Err(post_not_found()),
            (refreshed, total) => {
                let adjusted = matches!(total, Ok(Some(_)));
                let cause = refreshed
                    .err()
                    .or_else(|| total.err())
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                self.compensate(id, user_id, post.user_id, change, adjusted)
                    .await;
                Err(AppError::Internal(format!("Like toggle failed: {cause}")))
            }
        }
    }

    async fn author_total(&self, author: Uuid, delta: i64) -> Result<Option<i64>, RepoError> {
        if delta == 0 {
            return Ok(self
                .users
                .find_by_id(author)
                .await?
                .map(|u| u.total_likes_received));
        }
        let total = self.users.adjust_likes_received(author, delta).await?;
        if total.is_none() {
            warn!(user_id = %author, "Post author vanished during like toggle");
        }
        Ok(total)
    }

    /// Best-effort undo of a half-applied toggle. Failures are logged only.
    async fn compensate(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        author: Uuid,
        change: SetChange,
        adjusted: bool,
    ) {
        let reverted = match change {
            SetChange::Added => self.posts.remove_like(post_id, user_id).await.map(|_| ()),
            SetChange::Removed => self.posts.add_like(post_id, user_id).await.map(|_| ()),
            SetChange::None => Ok(()),
        };
        if let Err(e) = reverted {
            error!(post_id = %post_id, user_id = %user_id, error = %e, "Failed to revert like");
        }

        if adjusted && change != SetChange::None {
            if let Err(e) = self
                .users
                .adjust_likes_received(author, -change.delta())
                .await
            {
                error!(user_id = %author, error = %e, "Failed to revert author like total");
            }
        }

        if let Err(e) = self.posts.refresh_likes_count(post_id).await {
            warn!(post_id = %post_id, error = %e, "Failed to refresh like count after revert");
        }
    }
}

/// Row offset of a 1-based page, saturating so huge page numbers read past
/// the end instead of overflowing. Capped at `i64::MAX` for SQL backends.
fn page_offset(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1)
        .saturating_mul(limit)
        .min(i64::MAX as u64)
}
