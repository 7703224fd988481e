use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Artists::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Artists::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Artists::FirstName).string_len(128).not_null())
                    .col(ColumnDef::new(Artists::LastName).string_len(128).not_null())
                    .col(ColumnDef::new(Artists::StageName).string_len(255).not_null())
                    .col(ColumnDef::new(Artists::Age).small_integer().null())
                    .col(ColumnDef::new(Artists::Rating).double().not_null().default(0.0))
                    .col(ColumnDef::new(Artists::ImageUrl).string_len(1024).null())
                    .col(
                        ColumnDef::new(Artists::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_artists_stage_name")
                    .table(Artists::Table)
                    .col(Artists::StageName)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Artists::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Artists {
    Table,
    Id,
    FirstName,
    LastName,
    StageName,
    Age,
    Rating,
    ImageUrl,
    CreatedAt,
}
