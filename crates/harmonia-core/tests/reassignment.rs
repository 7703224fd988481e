mod common;

use sea_orm::EntityTrait;
use uuid::Uuid;

use harmonia_core::aggregates::recompute_album_listen_time;
use harmonia_core::reassign::reassign_song_album;
use harmonia_core::CoreError;
use harmonia_db::entities::{album, song};

async fn listen_time(db: &sea_orm::DatabaseConnection, album_id: Uuid) -> f32 {
    album::Entity::find_by_id(album_id)
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .listen_time_secs
}

#[tokio::test]
async fn moving_a_song_updates_both_albums() {
    let db = common::test_db().await;
    let artist = common::seed_artist(&db, "Nova").await;
    let cat = common::seed_category(&db, "rock").await;
    let a = common::seed_album(&db, "Alpha", artist.id, cat.id).await;
    let b = common::seed_album(&db, "Beta", artist.id, cat.id).await;
    let c = common::seed_album(&db, "Gamma", artist.id, cat.id).await;

    common::seed_song(&db, "S1", artist.id, cat.id, Some(a.id), 180.0).await;
    let s2 = common::seed_song(&db, "S2", artist.id, cat.id, Some(a.id), 240.0).await;
    common::seed_song(&db, "S3", artist.id, cat.id, Some(c.id), 300.0).await;
    recompute_album_listen_time(&db, a.id).await.unwrap();
    recompute_album_listen_time(&db, c.id).await.unwrap();
    assert_eq!(listen_time(&db, a.id).await, 420.0);
    assert_eq!(listen_time(&db, b.id).await, 0.0);

    let out = reassign_song_album(&db, s2.id, Some(b.id)).await.unwrap();
    assert_eq!(out.old_album_listen_time, Some(180.0));
    assert_eq!(out.new_album_listen_time, Some(240.0));

    // A lost exactly S2's length, B gained it, C is untouched.
    assert_eq!(listen_time(&db, a.id).await, 180.0);
    assert_eq!(listen_time(&db, b.id).await, 240.0);
    assert_eq!(listen_time(&db, c.id).await, 300.0);

    let moved = song::Entity::find_by_id(s2.id).one(&db).await.unwrap().unwrap();
    assert_eq!(moved.album_id, Some(b.id));
}

#[tokio::test]
async fn moving_to_no_album_leaves_the_song_unaffiliated() {
    let db = common::test_db().await;
    let artist = common::seed_artist(&db, "Nova").await;
    let cat = common::seed_category(&db, "rock").await;
    let a = common::seed_album(&db, "Alpha", artist.id, cat.id).await;
    let s = common::seed_song(&db, "S1", artist.id, cat.id, Some(a.id), 150.0).await;
    recompute_album_listen_time(&db, a.id).await.unwrap();

    let out = reassign_song_album(&db, s.id, None).await.unwrap();
    assert_eq!(out.old_album_listen_time, Some(0.0));
    assert_eq!(out.new_album_listen_time, None);

    let refreshed = song::Entity::find_by_id(s.id).one(&db).await.unwrap().unwrap();
    assert_eq!(refreshed.album_id, None);
    assert_eq!(listen_time(&db, a.id).await, 0.0);
}

#[tokio::test]
async fn assigning_an_unaffiliated_song_only_touches_the_gaining_album() {
    let db = common::test_db().await;
    let artist = common::seed_artist(&db, "Nova").await;
    let cat = common::seed_category(&db, "rock").await;
    let a = common::seed_album(&db, "Alpha", artist.id, cat.id).await;
    let s = common::seed_song(&db, "S1", artist.id, cat.id, None, 150.0).await;

    let out = reassign_song_album(&db, s.id, Some(a.id)).await.unwrap();
    assert_eq!(out.old_album_listen_time, None);
    assert_eq!(out.new_album_listen_time, Some(150.0));
    assert_eq!(listen_time(&db, a.id).await, 150.0);
}

#[tokio::test]
async fn same_album_reassignment_is_a_no_op() {
    let db = common::test_db().await;
    let artist = common::seed_artist(&db, "Nova").await;
    let cat = common::seed_category(&db, "rock").await;
    let a = common::seed_album(&db, "Alpha", artist.id, cat.id).await;
    let s = common::seed_song(&db, "S1", artist.id, cat.id, Some(a.id), 150.0).await;
    recompute_album_listen_time(&db, a.id).await.unwrap();

    let out = reassign_song_album(&db, s.id, Some(a.id)).await.unwrap();
    assert_eq!(out.old_album_listen_time, None);
    assert_eq!(out.new_album_listen_time, None);
    assert_eq!(listen_time(&db, a.id).await, 150.0);

    // Unaffiliated -> unaffiliated is equally a no-op.
    let loose = common::seed_song(&db, "S2", artist.id, cat.id, None, 90.0).await;
    let out = reassign_song_album(&db, loose.id, None).await.unwrap();
    assert_eq!(out.old_album_listen_time, None);
    assert_eq!(out.new_album_listen_time, None);
}

#[tokio::test]
async fn missing_song_or_target_album_rejects_without_mutation() {
    let db = common::test_db().await;
    let artist = common::seed_artist(&db, "Nova").await;
    let cat = common::seed_category(&db, "rock").await;
    let a = common::seed_album(&db, "Alpha", artist.id, cat.id).await;
    let s = common::seed_song(&db, "S1", artist.id, cat.id, Some(a.id), 150.0).await;
    recompute_album_listen_time(&db, a.id).await.unwrap();

    let ghost = Uuid::new_v4();
    let err = reassign_song_album(&db, ghost, Some(a.id)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound("song", id) if id == ghost));

    let err = reassign_song_album(&db, s.id, Some(ghost)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound("album", id) if id == ghost));

    // Nothing moved, nothing recomputed.
    let refreshed = song::Entity::find_by_id(s.id).one(&db).await.unwrap().unwrap();
    assert_eq!(refreshed.album_id, Some(a.id));
    assert_eq!(listen_time(&db, a.id).await, 150.0);
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let db = common::test_db().await;
    let artist = common::seed_artist(&db, "Nova").await;
    let cat = common::seed_category(&db, "rock").await;
    let a = common::seed_album(&db, "Alpha", artist.id, cat.id).await;
    common::seed_song(&db, "S1", artist.id, cat.id, Some(a.id), 120.0).await;
    common::seed_song(&db, "S2", artist.id, cat.id, Some(a.id), 60.0).await;

    let first = recompute_album_listen_time(&db, a.id).await.unwrap();
    let second = recompute_album_listen_time(&db, a.id).await.unwrap();
    assert_eq!(first, 180.0);
    assert_eq!(second, 180.0);
    assert_eq!(listen_time(&db, a.id).await, 180.0);
}
