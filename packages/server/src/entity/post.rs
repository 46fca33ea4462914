use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub caption: String,
    /// Display name copied from the user at creation time.
    pub author: String,
    /// Owning user. Not a foreign key: deleting a user leaves their posts.
    pub user_id: Uuid,

    pub media_url: String,
    /// One of: image, video
    pub media_type: String,

    /// Always equal to the number of `post_like` rows for this post.
    pub likes_count: i64,

    #[sea_orm(has_many)]
    pub likes: HasMany<super::post_like::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
