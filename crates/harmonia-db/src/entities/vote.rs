use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Entity kinds that can receive votes and carry a derived rating.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    #[sea_orm(string_value = "song")]
    Song,
    #[sea_orm(string_value = "album")]
    Album,
    #[sea_orm(string_value = "artist")]
    Artist,
    #[sea_orm(string_value = "category")]
    Category,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Song => "song",
            SubjectKind::Album => "album",
            SubjectKind::Artist => "artist",
            SubjectKind::Category => "category",
        }
    }
}

/// One voter's score for one subject. The `(subject_kind, subject_id,
/// voter_id)` triple is unique; a revote mutates `score` in place.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub subject_kind: SubjectKind,
    #[sea_orm(indexed)]
    pub subject_id: Uuid,
    /// Login of the voter as asserted by the upstream identity gateway.
    #[sea_orm(indexed)]
    pub voter_id: String,
    pub score: i16,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
