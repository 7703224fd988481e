use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, TryIntoModel,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use harmonia_core::{aggregates, reassign, votes, CoreError};
use harmonia_db::entities::{album, artist, category, song, SubjectKind};
use harmonia_db::AppState;

use super::{core_error, db_error, not_found, validation_error, ApiError};

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct SongResponse {
    pub id: Uuid,
    pub title: String,
    pub artist_id: Uuid,
    pub album_id: Option<Uuid>,
    pub category_id: Uuid,
    pub length_secs: f32,
    pub rating: f64,
    pub plays: i64,
    pub release_date: Option<chrono::NaiveDate>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    /// Joined artist stage name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    /// Joined album title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_title: Option<String>,
    /// Joined category name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

impl From<song::Model> for SongResponse {
    fn from(s: song::Model) -> Self {
        Self {
            id: s.id,
            title: s.title,
            artist_id: s.artist_id,
            album_id: s.album_id,
            category_id: s.category_id,
            length_secs: s.length_secs,
            rating: s.rating,
            plays: s.plays,
            release_date: s.release_date,
            created_at: s.created_at,
            artist_name: None,
            album_title: None,
            category_name: None,
        }
    }
}

/// Batch-join artist/album/category names onto a page of songs.
pub(crate) async fn enrich_songs<C: sea_orm::ConnectionTrait>(
    conn: &C,
    songs: Vec<song::Model>,
) -> Result<Vec<SongResponse>, ApiError> {
    let artist_ids: Vec<Uuid> = songs
        .iter()
        .map(|s| s.artist_id)
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    let album_ids: Vec<Uuid> = songs
        .iter()
        .filter_map(|s| s.album_id)
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    let category_ids: Vec<Uuid> = songs
        .iter()
        .map(|s| s.category_id)
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();

    let artists: HashMap<Uuid, String> = if !artist_ids.is_empty() {
        artist::Entity::find()
            .filter(artist::Column::Id.is_in(artist_ids))
            .all(conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|a| (a.id, a.stage_name))
            .collect()
    } else {
        HashMap::new()
    };

    let albums: HashMap<Uuid, String> = if !album_ids.is_empty() {
        album::Entity::find()
            .filter(album::Column::Id.is_in(album_ids))
            .all(conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|a| (a.id, a.title))
            .collect()
    } else {
        HashMap::new()
    };

    let categories: HashMap<Uuid, String> = if !category_ids.is_empty() {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect()
    } else {
        HashMap::new()
    };

    Ok(songs
        .into_iter()
        .map(|s| {
            let artist_name = artists.get(&s.artist_id).cloned();
            let album_title = s.album_id.and_then(|id| albums.get(&id).cloned());
            let category_name = categories.get(&s.category_id).cloned();
            let mut resp = SongResponse::from(s);
            resp.artist_name = artist_name;
            resp.album_title = album_title;
            resp.category_name = category_name;
            resp
        })
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct SongListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub artist_id: Option<Uuid>,
    pub album_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// GET /api/songs
pub async fn list_songs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SongListParams>,
) -> Result<Json<PaginatedResponse<SongResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);

    let mut query = song::Entity::find().order_by_desc(song::Column::CreatedAt);
    if let Some(artist_id) = params.artist_id {
        query = query.filter(song::Column::ArtistId.eq(artist_id));
    }
    if let Some(album_id) = params.album_id {
        query = query.filter(song::Column::AlbumId.eq(album_id));
    }
    if let Some(category_id) = params.category_id {
        query = query.filter(song::Column::CategoryId.eq(category_id));
    }

    let paginator = query.paginate(&state.db, per_page);
    let total = paginator.num_items().await.map_err(db_error)?;
    let songs = paginator.fetch_page(page - 1).await.map_err(db_error)?;
    let total_pages = total.div_ceil(per_page);

    let data = enrich_songs(&state.db, songs).await?;

    Ok(Json(PaginatedResponse {
        data,
        total,
        page,
        per_page,
        total_pages,
    }))
}

/// GET /api/songs/:id
pub async fn get_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SongResponse>, ApiError> {
    let song_model = song::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("song", id))?;

    let mut enriched = enrich_songs(&state.db, vec![song_model]).await?;
    Ok(Json(enriched.remove(0)))
}

#[derive(Debug, Deserialize)]
pub struct CreateSongRequest {
    pub title: String,
    pub artist_id: Uuid,
    pub category_id: Uuid,
    pub album_id: Option<Uuid>,
    pub length_secs: f32,
    pub release_date: Option<chrono::NaiveDate>,
}

/// POST /api/songs (admin)
pub async fn create_song(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSongRequest>,
) -> Result<(StatusCode, Json<SongResponse>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(validation_error("title", "title is required"));
    }
    if body.length_secs < 0.0 {
        return Err(validation_error("length_secs", "length cannot be negative"));
    }

    let txn = state.db.begin().await.map_err(db_error)?;

    if !aggregates::subject_exists(&txn, SubjectKind::Artist, body.artist_id)
        .await
        .map_err(core_error)?
    {
        return Err(not_found("artist", body.artist_id));
    }
    if !aggregates::subject_exists(&txn, SubjectKind::Category, body.category_id)
        .await
        .map_err(core_error)?
    {
        return Err(not_found("category", body.category_id));
    }
    if let Some(album_id) = body.album_id {
        if !aggregates::subject_exists(&txn, SubjectKind::Album, album_id)
            .await
            .map_err(core_error)?
        {
            return Err(not_found("album", album_id));
        }
    }

    let model = song::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(body.title),
        artist_id: Set(body.artist_id),
        album_id: Set(body.album_id),
        category_id: Set(body.category_id),
        length_secs: Set(body.length_secs),
        rating: Set(0.0),
        plays: Set(0),
        release_date: Set(body.release_date),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;

    if let Some(album_id) = model.album_id {
        aggregates::recompute_album_listen_time(&txn, album_id)
            .await
            .map_err(core_error)?;
    }
    aggregates::recompute_biography_stats(&txn, model.artist_id)
        .await
        .map_err(core_error)?;

    txn.commit().await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(SongResponse::from(model))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSongRequest {
    pub title: Option<String>,
    pub artist_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub length_secs: Option<f32>,
    pub release_date: Option<chrono::NaiveDate>,
}

/// PUT /api/songs/:id (admin) — metadata only; album membership changes go
/// through PUT /api/songs/:id/album so both albums' listen times stay right.
pub async fn update_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSongRequest>,
) -> Result<Json<SongResponse>, ApiError> {
    if let Some(length) = body.length_secs {
        if length < 0.0 {
            return Err(validation_error("length_secs", "length cannot be negative"));
        }
    }

    let txn = state.db.begin().await.map_err(db_error)?;

    let existing = song::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("song", id))?;
    let old_artist_id = existing.artist_id;
    let old_length = existing.length_secs;

    if let Some(artist_id) = body.artist_id {
        if !aggregates::subject_exists(&txn, SubjectKind::Artist, artist_id)
            .await
            .map_err(core_error)?
        {
            return Err(not_found("artist", artist_id));
        }
    }
    if let Some(category_id) = body.category_id {
        if !aggregates::subject_exists(&txn, SubjectKind::Category, category_id)
            .await
            .map_err(core_error)?
        {
            return Err(not_found("category", category_id));
        }
    }

    let mut active: song::ActiveModel = existing.into();
    if let Some(title) = body.title {
        if title.trim().is_empty() {
            return Err(validation_error("title", "title is required"));
        }
        active.title = Set(title);
    }
    if let Some(artist_id) = body.artist_id {
        active.artist_id = Set(artist_id);
    }
    if let Some(category_id) = body.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(length) = body.length_secs {
        active.length_secs = Set(length);
    }
    if let Some(release_date) = body.release_date {
        active.release_date = Set(Some(release_date));
    }

    let updated = if active.is_changed() {
        active
            .update(&txn)
            .await
            .map_err(|e| core_error(CoreError::from_update(e)))?
    } else {
        active.try_into_model().map_err(db_error)?
    };

    // A changed length shifts the album's sum even without a move.
    if updated.length_secs != old_length {
        if let Some(album_id) = updated.album_id {
            aggregates::recompute_album_listen_time(&txn, album_id)
                .await
                .map_err(core_error)?;
        }
    }
    if updated.artist_id != old_artist_id {
        aggregates::recompute_biography_stats(&txn, old_artist_id)
            .await
            .map_err(core_error)?;
        aggregates::recompute_biography_stats(&txn, updated.artist_id)
            .await
            .map_err(core_error)?;
    }

    txn.commit().await.map_err(db_error)?;
    Ok(Json(SongResponse::from(updated)))
}

#[derive(Debug, Deserialize)]
pub struct ReassignSongRequest {
    /// Target album; null moves the song out of any album.
    pub album_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReassignSongResponse {
    pub old_album_listen_time_secs: Option<f32>,
    pub new_album_listen_time_secs: Option<f32>,
}

/// PUT /api/songs/:id/album (admin) — change a song's album membership
pub async fn reassign_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReassignSongRequest>,
) -> Result<Json<ReassignSongResponse>, ApiError> {
    let outcome = reassign::reassign_song_album(&state.db, id, body.album_id)
        .await
        .map_err(core_error)?;

    Ok(Json(ReassignSongResponse {
        old_album_listen_time_secs: outcome.old_album_listen_time,
        new_album_listen_time_secs: outcome.new_album_listen_time,
    }))
}

/// DELETE /api/songs/:id (admin)
pub async fn delete_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    let existing = song::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("song", id))?;

    votes::delete_votes_for_subject(&txn, SubjectKind::Song, id)
        .await
        .map_err(core_error)?;

    song::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;

    if let Some(album_id) = existing.album_id {
        aggregates::recompute_album_listen_time(&txn, album_id)
            .await
            .map_err(core_error)?;
    }
    aggregates::recompute_biography_stats(&txn, existing.artist_id)
        .await
        .map_err(core_error)?;

    txn.commit().await.map_err(db_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_song_model() -> song::Model {
        song::Model {
            id: Uuid::new_v4(),
            title: "Test Song".into(),
            artist_id: Uuid::new_v4(),
            album_id: Some(Uuid::new_v4()),
            category_id: Uuid::new_v4(),
            length_secs: 240.5,
            rating: 4.2,
            plays: 42,
            release_date: None,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_song_response_from_model() {
        let model = make_song_model();
        let id = model.id;
        let resp = SongResponse::from(model);
        assert_eq!(resp.id, id);
        assert_eq!(resp.title, "Test Song");
        assert_eq!(resp.plays, 42);
        assert!(resp.artist_name.is_none());
        assert!(resp.album_title.is_none());
    }

    #[test]
    fn test_song_response_serialization() {
        let model = make_song_model();
        let resp = SongResponse::from(model);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["title"], "Test Song");
        assert_eq!(json["plays"], 42);
        // Optional None fields with skip_serializing_if should be absent
        assert!(json.get("artist_name").is_none());
        assert!(json.get("category_name").is_none());
    }

    #[test]
    fn test_paginated_response_serialization() {
        let resp = PaginatedResponse {
            data: vec!["a".to_string(), "b".to_string()],
            total: 10,
            page: 1,
            per_page: 2,
            total_pages: 5,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["total"], 10);
        assert_eq!(json["total_pages"], 5);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_reassign_request_accepts_null_album() {
        let req: ReassignSongRequest = serde_json::from_str(r#"{"album_id": null}"#).unwrap();
        assert!(req.album_id.is_none());
    }

    #[test]
    fn test_song_list_params_defaults() {
        let params: SongListParams = serde_json::from_str("{}").unwrap();
        assert!(params.page.is_none());
        assert!(params.artist_id.is_none());
        assert!(params.album_id.is_none());
    }
}
