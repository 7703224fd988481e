use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "biographies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique — at most one biography per artist.
    pub artist_id: Uuid,
    #[sea_orm(column_type = "Text", nullable)]
    pub early_life: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub career: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub artistry: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub personal_life: Option<String>,
    /// Derived: live count of the artist's songs.
    pub number_of_songs: i32,
    /// Derived: live count of the artist's albums.
    pub number_of_albums: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::artist::Entity",
        from = "Column::ArtistId",
        to = "super::artist::Column::Id"
    )]
    Artist,
}

impl Related<super::artist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artist.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
