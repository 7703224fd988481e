use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Votes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Votes::SubjectKind).string_len(16).not_null())
                    .col(ColumnDef::new(Votes::SubjectId).uuid().not_null())
                    .col(ColumnDef::new(Votes::VoterId).string_len(255).not_null())
                    .col(ColumnDef::new(Votes::Score).small_integer().not_null())
                    .col(
                        ColumnDef::new(Votes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // The single-vote invariant: one row per (kind, subject, voter).
        // The ledger also enforces this; the index catches insert races.
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_subject_voter")
                    .table(Votes::Table)
                    .col(Votes::SubjectKind)
                    .col(Votes::SubjectId)
                    .col(Votes::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_votes_subject")
                    .table(Votes::Table)
                    .col(Votes::SubjectKind)
                    .col(Votes::SubjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Votes {
    Table,
    Id,
    SubjectKind,
    SubjectId,
    VoterId,
    Score,
    CreatedAt,
}
