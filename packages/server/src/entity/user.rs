use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,

    #[sea_orm(column_type = "Text")]
    pub bio: String,
    pub profile_image: String,

    /// Likes received across all authored posts. Never negative.
    pub total_likes_received: i64,

    /// Back-reference to authored posts, maintained by the post aggregate.
    #[sea_orm(has_many)]
    pub authored: HasMany<super::user_post::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
