// Shared test utilities for core integration tests
#![allow(dead_code)]

use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use uuid::Uuid;

use harmonia_db::entities::{album, artist, biography, category, song};
use harmonia_migration::{Migrator, MigratorTrait};

/// Fresh in-memory SQLite database with the real schema applied.
/// One connection in the pool, so every query sees the same database.
pub async fn test_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1);
    let db = Database::connect(opt)
        .await
        .expect("failed to open in-memory sqlite");
    Migrator::up(&db, None).await.expect("failed to run migrations");
    db
}

pub async fn seed_artist(db: &DatabaseConnection, stage_name: &str) -> artist::Model {
    artist::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set("Test".into()),
        last_name: Set("Artist".into()),
        stage_name: Set(stage_name.to_owned()),
        age: Set(Some(30)),
        rating: Set(0.0),
        image_url: Set(None),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(db)
    .await
    .expect("failed to seed artist")
}

pub async fn seed_category(db: &DatabaseConnection, name: &str) -> category::Model {
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_uppercase()),
        rating: Set(0.0),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(db)
    .await
    .expect("failed to seed category")
}

pub async fn seed_album(
    db: &DatabaseConnection,
    title: &str,
    artist_id: Uuid,
    category_id: Uuid,
) -> album::Model {
    album::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_owned()),
        artist_id: Set(artist_id),
        category_id: Set(category_id),
        listen_time_secs: Set(0.0),
        rating: Set(0.0),
        release_date: Set(None),
        cover_url: Set(None),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(db)
    .await
    .expect("failed to seed album")
}

pub async fn seed_song(
    db: &DatabaseConnection,
    title: &str,
    artist_id: Uuid,
    category_id: Uuid,
    album_id: Option<Uuid>,
    length_secs: f32,
) -> song::Model {
    song::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_owned()),
        artist_id: Set(artist_id),
        album_id: Set(album_id),
        category_id: Set(category_id),
        length_secs: Set(length_secs),
        rating: Set(0.0),
        plays: Set(0),
        release_date: Set(None),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(db)
    .await
    .expect("failed to seed song")
}

pub async fn seed_biography(db: &DatabaseConnection, artist_id: Uuid) -> biography::Model {
    biography::ActiveModel {
        id: Set(Uuid::new_v4()),
        artist_id: Set(artist_id),
        early_life: Set(Some("Born somewhere.".into())),
        career: Set(None),
        artistry: Set(None),
        personal_life: Set(None),
        number_of_songs: Set(0),
        number_of_albums: Set(0),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(db)
    .await
    .expect("failed to seed biography")
}
