pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_artists;
mod m20240101_000002_create_categories;
mod m20240101_000003_create_albums;
mod m20240101_000004_create_songs;
mod m20240101_000005_create_biographies;
mod m20240101_000006_create_votes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_artists::Migration),
            Box::new(m20240101_000002_create_categories::Migration),
            Box::new(m20240101_000003_create_albums::Migration),
            Box::new(m20240101_000004_create_songs::Migration),
            Box::new(m20240101_000005_create_biographies::Migration),
            Box::new(m20240101_000006_create_votes::Migration),
        ]
    }
}
