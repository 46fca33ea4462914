use std::sync::Arc;
use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entity::{comment, post, user};
use crate::repository::memory::{
    MemoryCommentRepository, MemoryPostRepository, MemoryUserRepository,
};
use crate::repository::sql::{SqlCommentRepository, SqlPostRepository, SqlUserRepository};
use crate::repository::{CommentRepository, PostRepository, UserRepository};

/// The three aggregate repositories, sharing one backend.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryUserRepository::new()),
            posts: Arc::new(MemoryPostRepository::new()),
            comments: Arc::new(MemoryCommentRepository::new()),
        }
    }

    pub fn sql(db: DatabaseConnection) -> Self {
        Self {
            users: Arc::new(SqlUserRepository::new(db.clone())),
            posts: Arc::new(SqlPostRepository::new(db.clone())),
            comments: Arc::new(SqlCommentRepository::new(db)),
        }
    }
}

/// Connect to the configured database, or build the in-process store for
/// `memory:` URLs.
pub async fn connect(config: &DatabaseConfig) -> Result<Repositories, DbErr> {
    if config.is_in_memory() {
        warn!("Using the in-memory store; data is lost on restart");
        return Ok(Repositories::in_memory());
    }

    let db = init_db(&config.url).await?;
    ensure_indexes(&db).await?;
    Ok(Repositories::sql(db))
}

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("snapgram::entity::*")
        .sync(&db)
        .await?;

    Ok(db)
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &mut IndexCreateStatement) {
    let sql = stmt.if_not_exists().name(name).to_string(PostgresQueryBuilder);
    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}

/// Ensure the non-unique indexes used by listing queries exist.
///
/// Schema sync only creates unique indexes, so these are added on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Newest-first feed
    create_index(
        db,
        "idx_post_created",
        Index::create()
            .table(post::Entity)
            .col(post::Column::CreatedAt),
    )
    .await;

    // Posts by author, newest first; also the reconcile scan
    create_index(
        db,
        "idx_post_user_created",
        Index::create()
            .table(post::Entity)
            .col(post::Column::UserId)
            .col(post::Column::CreatedAt),
    )
    .await;

    // Comments on a post, newest first
    create_index(
        db,
        "idx_comment_post_created",
        Index::create()
            .table(comment::Entity)
            .col(comment::Column::PostId)
            .col(comment::Column::CreatedAt),
    )
    .await;

    // Leaderboard
    create_index(
        db,
        "idx_user_likes_received",
        Index::create()
            .table(user::Entity)
            .col(user::Column::TotalLikesReceived)
            .col(user::Column::CreatedAt),
    )
    .await;

    Ok(())
}
