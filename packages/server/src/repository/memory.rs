use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{
    AuthorSummary, CommentRecord, CommentRepository, LeaderboardRow, NewComment, NewPost,
    NewUser, Page, PostContent, PostRecord, PostRepository, RepoError, UserProfilePatch,
    UserRecord, UserRepository,
};

/// Row plus its insertion sequence, used to break timestamp ties.
struct Stored<T> {
    seq: u64,
    record: T,
}

/// Process-local user store. Username and email uniqueness are enforced
/// through claim maps, each entry owned by exactly one user id.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: DashMap<Uuid, Stored<UserRecord>>,
    usernames: DashMap<String, Uuid>,
    emails: DashMap<String, Uuid>,
    seq: AtomicU64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(map: &DashMap<String, Uuid>, key: &str, owner: Uuid) -> Result<(), RepoError> {
        match map.entry(key.to_string()) {
            Entry::Occupied(e) if *e.get() != owner => {
                Err(RepoError::Conflict(format!("'{key}' is taken")))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(owner);
                Ok(())
            }
        }
    }

    fn release(map: &DashMap<String, Uuid>, key: &str, owner: Uuid) {
        map.remove_if(key, |_, id| *id == owner);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, new: NewUser) -> Result<UserRecord, RepoError> {
        let id = Uuid::now_v7();
        Self::claim(&self.usernames, &new.username, id)?;
        if let Err(e) = Self::claim(&self.emails, &new.email, id) {
            Self::release(&self.usernames, &new.username, id);
            return Err(e);
        }

        let now = Utc::now();
        let record = UserRecord {
            id,
            username: new.username,
            email: new.email,
            password: new.password,
            bio: new.bio,
            profile_image: new.profile_image,
            total_likes_received: 0,
            posts: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.users.insert(
            id,
            Stored {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.get(&id).map(|s| s.record.clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let Some(id) = self.usernames.get(username).map(|e| *e.value()) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: UserProfilePatch,
    ) -> Result<Option<UserRecord>, RepoError> {
        let Some(current) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        if let Some(username) = patch.username.as_deref().filter(|u| *u != current.username) {
            Self::claim(&self.usernames, username, id)?;
        }
        if let Some(email) = patch.email.as_deref().filter(|e| *e != current.email) {
            if let Err(e) = Self::claim(&self.emails, email, id) {
                if let Some(username) = patch.username.as_deref() {
                    if username != current.username {
                        Self::release(&self.usernames, username, id);
                    }
                }
                return Err(e);
            }
        }

        let Some(mut stored) = self.users.get_mut(&id) else {
            return Ok(None);
        };
        let user = &mut stored.record;
        if let Some(username) = patch.username {
            if username != user.username {
                Self::release(&self.usernames, &user.username, id);
            }
            user.username = username;
        }
        if let Some(email) = patch.email {
            if email != user.email {
                Self::release(&self.emails, &user.email, id);
            }
            user.email = email;
        }
        if let Some(password) = patch.password {
            user.password = password;
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        if let Some(profile_image) = patch.profile_image {
            user.profile_image = profile_image;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let Some((_, stored)) = self.users.remove(&id) else {
            return Ok(false);
        };
        Self::release(&self.usernames, &stored.record.username, id);
        Self::release(&self.emails, &stored.record.email, id);
        Ok(true)
    }

    async fn push_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let Some(mut stored) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if !stored.record.posts.contains(&post_id) {
            stored.record.posts.push(post_id);
        }
        Ok(true)
    }

    async fn pull_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let Some(mut stored) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = stored.record.posts.len();
        stored.record.posts.retain(|id| *id != post_id);
        Ok(stored.record.posts.len() != before)
    }

    async fn adjust_likes_received(
        &self,
        user_id: Uuid,
        delta: i64,
    ) -> Result<Option<i64>, RepoError> {
        // The shard write guard serialises adjustments to the same user.
        let Some(mut stored) = self.users.get_mut(&user_id) else {
            return Ok(None);
        };
        let user = &mut stored.record;
        user.total_likes_received = user.total_likes_received.saturating_add(delta).max(0);
        user.updated_at = Utc::now();
        Ok(Some(user.total_likes_received))
    }

    async fn leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardRow>, RepoError> {
        let mut ranked: Vec<(i64, chrono::DateTime<Utc>, u64, LeaderboardRow)> = self
            .users
            .iter()
            .map(|s| {
                let u = &s.record;
                (
                    u.total_likes_received,
                    u.created_at,
                    s.seq,
                    LeaderboardRow {
                        username: u.username.clone(),
                        total_likes_received: u.total_likes_received,
                        profile_image: u.profile_image.clone(),
                    },
                )
            })
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        Ok(ranked
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(_, _, _, row)| row)
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryPostRepository {
    posts: DashMap<Uuid, Stored<PostRecord>>,
    seq: AtomicU64,
}

impl MemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for MemoryPostRepository {
    async fn insert(&self, new: NewPost) -> Result<PostRecord, RepoError> {
        let now = Utc::now();
        let record = PostRecord {
            id: Uuid::now_v7(),
            title: new.title,
            caption: new.caption,
            author: new.author,
            user_id: new.user_id,
            media_url: new.media_url,
            media_type: new.media_type,
            likes: Vec::new(),
            likes_count: 0,
            created_at: now,
            updated_at: now,
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.posts.insert(
            record.id,
            Stored {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.posts.get(&id).map(|s| s.record.clone()))
    }

    async fn list(
        &self,
        author: Option<Uuid>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<PostRecord>, RepoError> {
        let mut matching: Vec<(u64, PostRecord)> = self
            .posts
            .iter()
            .filter(|s| author.is_none_or(|id| s.record.user_id == id))
            .map(|s| (s.seq, s.record.clone()))
            .collect();
        matching.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then(b.0.cmp(&a.0))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(_, post)| post)
            .collect();
        Ok(Page { items, total })
    }

    async fn replace_content(
        &self,
        id: Uuid,
        content: PostContent,
    ) -> Result<Option<PostRecord>, RepoError> {
        let Some(mut stored) = self.posts.get_mut(&id) else {
            return Ok(None);
        };
        let post = &mut stored.record;
        post.title = content.title;
        post.caption = content.caption;
        post.media_url = content.media_url;
        post.media_type = content.media_type;
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.posts.remove(&id).is_some())
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let Some(mut stored) = self.posts.get_mut(&post_id) else {
            return Ok(false);
        };
        if stored.record.likes.contains(&user_id) {
            return Ok(false);
        }
        stored.record.likes.push(user_id);
        Ok(true)
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let Some(mut stored) = self.posts.get_mut(&post_id) else {
            return Ok(false);
        };
        let before = stored.record.likes.len();
        stored.record.likes.retain(|id| *id != user_id);
        Ok(stored.record.likes.len() != before)
    }

    async fn refresh_likes_count(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let Some(mut stored) = self.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        stored.record.likes_count = stored.record.likes.len() as i64;
        Ok(Some(stored.record.clone()))
    }

    async fn author_summary(&self, user_id: Uuid) -> Result<AuthorSummary, RepoError> {
        let mut owned: Vec<(chrono::DateTime<Utc>, u64, Uuid, i64)> = self
            .posts
            .iter()
            .filter(|s| s.record.user_id == user_id)
            .map(|s| (s.record.created_at, s.seq, s.record.id, s.record.likes_count))
            .collect();
        owned.sort();

        Ok(AuthorSummary {
            likes_held: owned.iter().map(|(_, _, _, likes)| likes).sum(),
            post_ids: owned.into_iter().map(|(_, _, id, _)| id).collect(),
        })
    }
}

#[derive(Default)]
pub struct MemoryCommentRepository {
    comments: DashMap<Uuid, Stored<CommentRecord>>,
    seq: AtomicU64,
}

impl MemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentRepository for MemoryCommentRepository {
    async fn insert(&self, new: NewComment) -> Result<CommentRecord, RepoError> {
        let record = CommentRecord {
            id: Uuid::now_v7(),
            content: new.content,
            post_id: new.post_id,
            user_id: new.user_id,
            username: new.username,
            created_at: Utc::now(),
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.comments.insert(
            record.id,
            Stored {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.comments.get(&id).map(|s| s.record.clone()))
    }

    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut matching: Vec<(u64, CommentRecord)> = self
            .comments
            .iter()
            .filter(|s| s.record.post_id == post_id)
            .map(|s| (s.seq, s.record.clone()))
            .collect();
        matching.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then(b.0.cmp(&a.0))
        });
        Ok(matching.into_iter().map(|(_, c)| c).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        Ok(self.comments.remove(&id).is_some())
    }
}
