use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use super::{
    AuthorSummary, CommentRecord, CommentRepository, LeaderboardRow, NewComment, NewPost,
    NewUser, Page, PostContent, PostRecord, PostRepository, RepoError, UserProfilePatch,
    UserRecord, UserRepository,
};
use crate::entity::{comment, post, post_like, user, user_post};

async fn authored_post_ids<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<Vec<Uuid>, DbErr> {
    user_post::Entity::find()
        .select_only()
        .column(user_post::Column::PostId)
        .filter(user_post::Column::UserId.eq(user_id))
        .order_by_asc(user_post::Column::CreatedAt)
        .into_tuple()
        .all(conn)
        .await
}

fn user_record(model: user::Model, posts: Vec<Uuid>) -> UserRecord {
    UserRecord {
        id: model.id,
        username: model.username,
        email: model.email,
        password: model.password,
        bio: model.bio,
        profile_image: model.profile_image,
        total_likes_received: model.total_likes_received,
        posts,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub struct SqlUserRepository {
    db: DatabaseConnection,
}

impl SqlUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn with_posts(&self, model: Option<user::Model>) -> Result<Option<UserRecord>, RepoError> {
        match model {
            Some(model) => {
                let posts = authored_post_ids(&self.db, model.id).await?;
                Ok(Some(user_record(model, posts)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn insert(&self, new: NewUser) -> Result<UserRecord, RepoError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::now_v7()),
            username: Set(new.username),
            email: Set(new.email),
            password: Set(new.password),
            bio: Set(new.bio),
            profile_image: Set(new.profile_image),
            total_likes_received: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(user_record(model, Vec::new()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let model = user::Entity::find_by_id(id).one(&self.db).await?;
        self.with_posts(model).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?;
        self.with_posts(model).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: UserProfilePatch,
    ) -> Result<Option<UserRecord>, RepoError> {
        let Some(existing) = user::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();
        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(password) = patch.password {
            active.password = Set(password);
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(bio);
        }
        if let Some(profile_image) = patch.profile_image {
            active.profile_image = Set(profile_image);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        self.with_posts(Some(updated)).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let txn = self.db.begin().await?;

        user_post::Entity::delete_many()
            .filter(user_post::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        let result = user::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn push_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        if user::Entity::find_by_id(user_id).one(&self.db).await?.is_none() {
            return Ok(false);
        }

        let entry = user_post::ActiveModel {
            user_id: Set(user_id),
            post_id: Set(post_id),
            created_at: Set(Utc::now()),
        };
        let result = user_post::Entity::insert(entry)
            .on_conflict(
                OnConflict::columns([user_post::Column::UserId, user_post::Column::PostId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match result {
            Ok(_) | Err(DbErr::RecordNotInserted) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn pull_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool, RepoError> {
        let result = user_post::Entity::delete_many()
            .filter(user_post::Column::UserId.eq(user_id))
            .filter(user_post::Column::PostId.eq(post_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn adjust_likes_received(
        &self,
        user_id: Uuid,
        delta: i64,
    ) -> Result<Option<i64>, RepoError> {
        let txn = self.db.begin().await?;

        let Some(author) = user::Entity::find_by_id(user_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };

        let total = author.total_likes_received.saturating_add(delta).max(0);
        user::Entity::update_many()
            .col_expr(user::Column::TotalLikesReceived, Expr::value(total))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(Some(total))
    }

    async fn leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardRow>, RepoError> {
        let rows = user::Entity::find()
            .select_only()
            .column(user::Column::Username)
            .column(user::Column::TotalLikesReceived)
            .column(user::Column::ProfileImage)
            .order_by_desc(user::Column::TotalLikesReceived)
            .order_by_asc(user::Column::CreatedAt)
            .limit(limit)
            .into_model::<LeaderboardRow>()
            .all(&self.db)
            .await?;
        Ok(rows)
    }
}

pub struct SqlPostRepository {
    db: DatabaseConnection,
}

impl SqlPostRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Likes for each of `post_ids`, oldest first.
    async fn likes_by_post<C: ConnectionTrait>(
        conn: &C,
        post_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Uuid>>, DbErr> {
        let mut likes: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(likes);
        }

        let rows = post_like::Entity::find()
            .filter(post_like::Column::PostId.is_in(post_ids.iter().copied()))
            .order_by_asc(post_like::Column::CreatedAt)
            .all(conn)
            .await?;
        for row in rows {
            likes.entry(row.post_id).or_default().push(row.user_id);
        }
        Ok(likes)
    }

    async fn hydrate<C: ConnectionTrait>(
        conn: &C,
        models: Vec<post::Model>,
    ) -> Result<Vec<PostRecord>, DbErr> {
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut likes = Self::likes_by_post(conn, &ids).await?;
        Ok(models
            .into_iter()
            .map(|model| {
                let post_likes = likes.remove(&model.id).unwrap_or_default();
                post_record(model, post_likes)
            })
            .collect())
    }

    async fn hydrate_one<C: ConnectionTrait>(
        conn: &C,
        model: Option<post::Model>,
    ) -> Result<Option<PostRecord>, DbErr> {
        Ok(Self::hydrate(conn, model.into_iter().collect())
            .await?
            .into_iter()
            .next())
    }
}

fn post_record(model: post::Model, likes: Vec<Uuid>) -> PostRecord {
    PostRecord {
        id: model.id,
        title: model.title,
        caption: model.caption,
        author: model.author,
        user_id: model.user_id,
        media_url: model.media_url,
        media_type: model.media_type.parse().unwrap_or_default(),
        likes,
        likes_count: model.likes_count,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl PostRepository for SqlPostRepository {
    async fn insert(&self, new: NewPost) -> Result<PostRecord, RepoError> {
        let now = Utc::now();
        let model = post::ActiveModel {
            id: Set(Uuid::now_v7()),
            title: Set(new.title),
            caption: Set(new.caption),
            author: Set(new.author),
            user_id: Set(new.user_id),
            media_url: Set(new.media_url),
            media_type: Set(new.media_type.to_string()),
            likes_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        Ok(post_record(model, Vec::new()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let model = post::Entity::find_by_id(id).one(&self.db).await?;
        Ok(Self::hydrate_one(&self.db, model).await?)
    }

    async fn list(
        &self,
        author: Option<Uuid>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<PostRecord>, RepoError> {
        let mut query = post::Entity::find();
        if let Some(user_id) = author {
            query = query.filter(post::Column::UserId.eq(user_id));
        }

        let total = query.clone().count(&self.db).await?;
        let models = query
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(Page {
            items: Self::hydrate(&self.db, models).await?,
            total,
        })
    }

    async fn replace_content(
        &self,
        id: Uuid,
        content: PostContent,
    ) -> Result<Option<PostRecord>, RepoError> {
        let Some(existing) = post::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let mut active: post::ActiveModel = existing.into();
        active.title = Set(content.title);
        active.caption = Set(content.caption);
        active.media_url = Set(content.media_url);
        active.media_type = Set(content.media_type.to_string());
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(Self::hydrate_one(&self.db, Some(updated)).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let txn = self.db.begin().await?;

        post_like::Entity::delete_many()
            .filter(post_like::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        let result = post::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn add_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let like = post_like::ActiveModel {
            post_id: Set(post_id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
        };
        let result = post_like::Entity::insert(like)
            .on_conflict(
                OnConflict::columns([post_like::Column::PostId, post_like::Column::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await;

        match result {
            Ok(inserted) => Ok(inserted > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            // The post was deleted between the caller's lookup and this insert.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_like(&self, post_id: Uuid, user_id: Uuid) -> Result<bool, RepoError> {
        let result = post_like::Entity::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn refresh_likes_count(&self, post_id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        // The row lock orders concurrent refreshes, so the last writer always
        // counts a superset of the likes the earlier ones saw.
        let txn = self.db.begin().await?;

        let Some(existing) = post::Entity::find_by_id(post_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
        else {
            return Ok(None);
        };

        let likes = Self::likes_by_post(&txn, &[post_id])
            .await?
            .remove(&post_id)
            .unwrap_or_default();
        let count = likes.len() as i64;

        if existing.likes_count != count {
            post::Entity::update_many()
                .col_expr(post::Column::LikesCount, Expr::value(count))
                .filter(post::Column::Id.eq(post_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        let mut record = post_record(existing, likes);
        record.likes_count = count;
        Ok(Some(record))
    }

    async fn author_summary(&self, user_id: Uuid) -> Result<AuthorSummary, RepoError> {
        let rows: Vec<(Uuid, i64)> = post::Entity::find()
            .select_only()
            .column(post::Column::Id)
            .column(post::Column::LikesCount)
            .filter(post::Column::UserId.eq(user_id))
            .order_by_asc(post::Column::CreatedAt)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(AuthorSummary {
            likes_held: rows.iter().map(|(_, likes)| likes).sum(),
            post_ids: rows.into_iter().map(|(id, _)| id).collect(),
        })
    }
}

pub struct SqlCommentRepository {
    db: DatabaseConnection,
}

impl SqlCommentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<comment::Model> for CommentRecord {
    fn from(model: comment::Model) -> Self {
        Self {
            id: model.id,
            content: model.content,
            post_id: model.post_id,
            user_id: model.user_id,
            username: model.username,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl CommentRepository for SqlCommentRepository {
    async fn insert(&self, new: NewComment) -> Result<CommentRecord, RepoError> {
        let model = comment::ActiveModel {
            id: Set(Uuid::now_v7()),
            content: Set(new.content),
            post_id: Set(new.post_id),
            user_id: Set(new.user_id),
            username: Set(new.username),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        let model = comment::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let models = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = comment::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
