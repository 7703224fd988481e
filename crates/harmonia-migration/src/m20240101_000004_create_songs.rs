use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_artists::Artists;
use super::m20240101_000002_create_categories::Categories;
use super::m20240101_000003_create_albums::Albums;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Songs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Songs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Songs::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Songs::ArtistId).uuid().not_null())
                    .col(ColumnDef::new(Songs::AlbumId).uuid().null())
                    .col(ColumnDef::new(Songs::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(Songs::LengthSecs).float().not_null())
                    .col(ColumnDef::new(Songs::Rating).double().not_null().default(0.0))
                    .col(ColumnDef::new(Songs::Plays).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Songs::ReleaseDate).date().null())
                    .col(
                        ColumnDef::new(Songs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_songs_artist_id")
                            .from(Songs::Table, Songs::ArtistId)
                            .to(Artists::Table, Artists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_songs_album_id")
                            .from(Songs::Table, Songs::AlbumId)
                            .to(Albums::Table, Albums::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_songs_category_id")
                            .from(Songs::Table, Songs::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_artist_id")
                    .table(Songs::Table)
                    .col(Songs::ArtistId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_album_id")
                    .table(Songs::Table)
                    .col(Songs::AlbumId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_songs_title")
                    .table(Songs::Table)
                    .col(Songs::Title)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Songs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Songs {
    Table,
    Id,
    Title,
    ArtistId,
    AlbumId,
    CategoryId,
    LengthSecs,
    Rating,
    Plays,
    ReleaseDate,
    CreatedAt,
}
