use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_artists::Artists;
use super::m20240101_000002_create_categories::Categories;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Albums::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Albums::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Albums::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Albums::ArtistId).uuid().not_null())
                    .col(ColumnDef::new(Albums::CategoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(Albums::ListenTimeSecs)
                            .float()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Albums::Rating).double().not_null().default(0.0))
                    .col(ColumnDef::new(Albums::ReleaseDate).date().null())
                    .col(ColumnDef::new(Albums::CoverUrl).string_len(1024).null())
                    .col(
                        ColumnDef::new(Albums::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_albums_artist_id")
                            .from(Albums::Table, Albums::ArtistId)
                            .to(Artists::Table, Artists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_albums_category_id")
                            .from(Albums::Table, Albums::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_albums_artist_id")
                    .table(Albums::Table)
                    .col(Albums::ArtistId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_albums_category_id")
                    .table(Albums::Table)
                    .col(Albums::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_albums_title")
                    .table(Albums::Table)
                    .col(Albums::Title)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Albums::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Albums {
    Table,
    Id,
    Title,
    ArtistId,
    CategoryId,
    ListenTimeSecs,
    Rating,
    ReleaseDate,
    CoverUrl,
    CreatedAt,
}
