use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_artists::Artists;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Biographies::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Biographies::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Biographies::ArtistId).uuid().not_null())
                    .col(ColumnDef::new(Biographies::EarlyLife).text().null())
                    .col(ColumnDef::new(Biographies::Career).text().null())
                    .col(ColumnDef::new(Biographies::Artistry).text().null())
                    .col(ColumnDef::new(Biographies::PersonalLife).text().null())
                    .col(
                        ColumnDef::new(Biographies::NumberOfSongs)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Biographies::NumberOfAlbums)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Biographies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_biographies_artist_id")
                            .from(Biographies::Table, Biographies::ArtistId)
                            .to(Artists::Table, Artists::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One biography per artist.
        manager
            .create_index(
                Index::create()
                    .name("idx_biographies_artist_id")
                    .table(Biographies::Table)
                    .col(Biographies::ArtistId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Biographies::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Biographies {
    Table,
    Id,
    ArtistId,
    EarlyLife,
    Career,
    Artistry,
    PersonalLife,
    NumberOfSongs,
    NumberOfAlbums,
    CreatedAt,
}
