mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{as_admin, as_client, test_server};

/// Create artist + category + one song through the API, returning their ids.
async fn seed_song(server: &axum_test::TestServer) -> (Uuid, Uuid, Uuid) {
    let res = as_admin(server.post("/api/artists"))
        .json(&json!({
            "first_name": "Nora",
            "last_name": "Vale",
            "stage_name": "Nova",
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let artist_id: Uuid = res.json::<Value>()["id"].as_str().unwrap().parse().unwrap();

    let res = as_admin(server.post("/api/categories"))
        .json(&json!({ "name": "rock" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let category_id: Uuid = res.json::<Value>()["id"].as_str().unwrap().parse().unwrap();

    let res = as_admin(server.post("/api/songs"))
        .json(&json!({
            "title": "Orbit",
            "artist_id": artist_id,
            "category_id": category_id,
            "length_secs": 200.0,
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let song_id: Uuid = res.json::<Value>()["id"].as_str().unwrap().parse().unwrap();

    (artist_id, category_id, song_id)
}

#[tokio::test]
async fn voting_flow_create_then_revote() {
    let (server, _state) = test_server().await;
    let (_, _, song_id) = seed_song(&server).await;

    // No vote yet.
    let res = as_client(
        server.get(&format!(
            "/api/votes/status?subject_kind=song&subject_id={song_id}"
        )),
        "alice",
    )
    .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["has_voted"], false);

    // First cast creates.
    let res = as_client(server.post("/api/votes"), "alice")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 3 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body: Value = res.json();
    assert_eq!(body["created"], true);
    assert_eq!(body["new_rating"], 3.0);

    let res = as_client(server.get(&format!("/api/songs/{song_id}")), "alice").await;
    assert_eq!(res.json::<Value>()["rating"], 3.0);

    // Revote mutates the same vote.
    let res = as_client(server.post("/api/votes"), "alice")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 5 }))
        .await;
    let body: Value = res.json();
    assert_eq!(body["created"], false);
    assert_eq!(body["new_rating"], 5.0);

    let res = as_client(
        server.get(&format!(
            "/api/votes/status?subject_kind=song&subject_id={song_id}"
        )),
        "alice",
    )
    .await;
    assert_eq!(res.json::<Value>()["has_voted"], true);

    // A second voter moves the mean, not the first voter's row.
    let res = as_client(server.post("/api/votes"), "bob")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 4 }))
        .await;
    let body: Value = res.json();
    assert_eq!(body["created"], true);
    assert_eq!(body["new_rating"], 4.5);
}

#[tokio::test]
async fn invalid_score_is_rejected_and_nothing_changes() {
    let (server, _state) = test_server().await;
    let (_, _, song_id) = seed_song(&server).await;

    let res = as_client(server.post("/api/votes"), "alice")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 6 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = as_client(server.get(&format!("/api/songs/{song_id}")), "alice").await;
    assert_eq!(res.json::<Value>()["rating"], 0.0);

    let res = as_client(
        server.get(&format!(
            "/api/votes/status?subject_kind=song&subject_id={song_id}"
        )),
        "alice",
    )
    .await;
    assert_eq!(res.json::<Value>()["has_voted"], false);
}

#[tokio::test]
async fn vote_on_missing_subject_is_404() {
    let (server, _state) = test_server().await;
    let ghost = Uuid::new_v4();

    let res = as_client(server.post("/api/votes"), "alice")
        .json(&json!({ "subject_kind": "album", "subject_id": ghost, "score": 4 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn votes_require_an_identity() {
    let (server, _state) = test_server().await;
    let (_, _, song_id) = seed_song(&server).await;

    let res = server
        .post("/api/votes")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 4 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn biography_votes_land_on_the_artist() {
    let (server, _state) = test_server().await;
    let (artist_id, _, _) = seed_song(&server).await;

    let res = as_admin(server.post("/api/biographies"))
        .json(&json!({ "artist_id": artist_id, "early_life": "Born somewhere." }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let bio_id: Uuid = res.json::<Value>()["id"].as_str().unwrap().parse().unwrap();

    let res = as_client(server.post("/api/votes"), "alice")
        .json(&json!({ "subject_kind": "biography", "subject_id": bio_id, "score": 4 }))
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.json::<Value>()["new_rating"], 4.0);

    // The artist's rating moved; an artist-kind vote by the same voter is
    // the same ledger entry.
    let res = as_client(server.get(&format!("/api/artists/{artist_id}")), "alice").await;
    assert_eq!(res.json::<Value>()["rating"], 4.0);

    let res = as_client(
        server.get(&format!(
            "/api/votes/status?subject_kind=artist&subject_id={artist_id}"
        )),
        "alice",
    )
    .await;
    assert_eq!(res.json::<Value>()["has_voted"], true);
}

#[tokio::test]
async fn deleting_a_song_removes_its_votes() {
    let (server, state) = test_server().await;
    let (_, _, song_id) = seed_song(&server).await;

    as_client(server.post("/api/votes"), "alice")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 4 }))
        .await
        .assert_status_ok();
    as_client(server.post("/api/votes"), "bob")
        .json(&json!({ "subject_kind": "song", "subject_id": song_id, "score": 2 }))
        .await
        .assert_status_ok();

    let res = as_admin(server.delete(&format!("/api/songs/{song_id}"))).await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);

    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
    let orphaned = harmonia_db::entities::vote::Entity::find()
        .filter(harmonia_db::entities::vote::Column::SubjectId.eq(song_id))
        .count(&state.db)
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
}
