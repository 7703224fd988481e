use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait, TryIntoModel,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use harmonia_core::{aggregates, votes, CoreError};
use harmonia_db::entities::{album, artist, biography, song, SubjectKind};
use harmonia_db::AppState;

use super::albums::AlbumResponse;
use super::songs::{enrich_songs, PaginatedResponse, PaginationParams, SongResponse};
use super::{core_error, db_error, not_found, validation_error, ApiError};

#[derive(Debug, Serialize)]
pub struct ArtistResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub stage_name: String,
    pub age: Option<i16>,
    pub rating: f64,
    pub image_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<artist::Model> for ArtistResponse {
    fn from(a: artist::Model) -> Self {
        Self {
            id: a.id,
            first_name: a.first_name,
            last_name: a.last_name,
            stage_name: a.stage_name,
            age: a.age,
            rating: a.rating,
            image_url: a.image_url,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArtistDetailResponse {
    #[serde(flatten)]
    pub artist: ArtistResponse,
    pub albums: Vec<AlbumResponse>,
    pub songs: Vec<SongResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography_id: Option<Uuid>,
}

/// Compact row for the typeahead search on artist pages.
#[derive(Debug, Serialize)]
pub struct ArtistSearchResult {
    pub id: Uuid,
    pub stage_name: String,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography_id: Option<Uuid>,
}

/// Case-insensitive stage-name uniqueness check.
async fn stage_name_taken<C: ConnectionTrait>(
    conn: &C,
    stage_name: &str,
    exclude: Option<Uuid>,
) -> Result<bool, ApiError> {
    let mut query = artist::Entity::find().filter(
        Expr::expr(Func::upper(Expr::col(artist::Column::StageName)))
            .eq(stage_name.to_uppercase()),
    );
    if let Some(id) = exclude {
        query = query.filter(artist::Column::Id.ne(id));
    }
    Ok(query.count(conn).await.map_err(db_error)? > 0)
}

/// GET /api/artists
pub async fn list_artists(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<ArtistResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);

    let paginator = artist::Entity::find()
        .order_by_asc(artist::Column::StageName)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await.map_err(db_error)?;
    let artists = paginator.fetch_page(page - 1).await.map_err(db_error)?;
    let total_pages = total.div_ceil(per_page);

    Ok(Json(PaginatedResponse {
        data: artists.into_iter().map(ArtistResponse::from).collect(),
        total,
        page,
        per_page,
        total_pages,
    }))
}

/// GET /api/artists/:id — the artist plus their albums and songs
pub async fn get_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArtistDetailResponse>, ApiError> {
    let artist_model = artist::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("artist", id))?;

    let albums = album::Entity::find()
        .filter(album::Column::ArtistId.eq(id))
        .order_by_desc(album::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let songs = song::Entity::find()
        .filter(song::Column::ArtistId.eq(id))
        .order_by_desc(song::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let biography_id = biography::Entity::find()
        .filter(biography::Column::ArtistId.eq(id))
        .one(&state.db)
        .await
        .map_err(db_error)?
        .map(|b| b.id);

    Ok(Json(ArtistDetailResponse {
        albums: albums
            .into_iter()
            .map(|a| {
                AlbumResponse::from_model(a, Some(artist_model.stage_name.clone()), None)
            })
            .collect(),
        songs: enrich_songs(&state.db, songs).await?,
        biography_id,
        artist: ArtistResponse::from(artist_model),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ArtistSearchParams {
    pub q: String,
}

/// GET /api/artists/search?q=… — stage-name substring match
pub async fn search_artists(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArtistSearchParams>,
) -> Result<Json<Vec<ArtistSearchResult>>, ApiError> {
    let q = params.q.trim();
    if q.is_empty() {
        return Ok(Json(vec![]));
    }
    let pattern = super::search::like_pattern(q);

    let artists = artist::Entity::find()
        .filter(
            Expr::expr(Func::upper(Expr::col(artist::Column::StageName))).like(&pattern),
        )
        .order_by_asc(artist::Column::StageName)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let artist_ids: Vec<Uuid> = artists.iter().map(|a| a.id).collect();
    let bios: std::collections::HashMap<Uuid, Uuid> = if !artist_ids.is_empty() {
        biography::Entity::find()
            .filter(biography::Column::ArtistId.is_in(artist_ids))
            .all(&state.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|b| (b.artist_id, b.id))
            .collect()
    } else {
        std::collections::HashMap::new()
    };

    Ok(Json(
        artists
            .into_iter()
            .map(|a| ArtistSearchResult {
                biography_id: bios.get(&a.id).copied(),
                id: a.id,
                stage_name: a.stage_name,
                first_name: a.first_name,
                last_name: a.last_name,
                image_url: a.image_url,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateArtistRequest {
    pub first_name: String,
    pub last_name: String,
    pub stage_name: String,
    pub age: Option<i16>,
    pub image_url: Option<String>,
}

/// POST /api/artists (admin)
pub async fn create_artist(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateArtistRequest>,
) -> Result<(StatusCode, Json<ArtistResponse>), ApiError> {
    if body.stage_name.trim().is_empty() {
        return Err(validation_error("stage_name", "stage name is required"));
    }
    if stage_name_taken(&state.db, &body.stage_name, None).await? {
        return Err(validation_error(
            "stage_name",
            "this stage name is already used",
        ));
    }

    let model = artist::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(body.first_name),
        last_name: Set(body.last_name),
        stage_name: Set(body.stage_name),
        age: Set(body.age),
        // Ratings start at zero and only the vote ledger moves them.
        rating: Set(0.0),
        image_url: Set(body.image_url),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    Ok((StatusCode::CREATED, Json(ArtistResponse::from(model))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateArtistRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub stage_name: Option<String>,
    pub age: Option<i16>,
    pub image_url: Option<String>,
}

/// PUT /api/artists/:id (admin)
pub async fn update_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateArtistRequest>,
) -> Result<Json<ArtistResponse>, ApiError> {
    let existing = artist::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("artist", id))?;

    if let Some(ref stage_name) = body.stage_name {
        if stage_name.trim().is_empty() {
            return Err(validation_error("stage_name", "stage name is required"));
        }
        if stage_name_taken(&state.db, stage_name, Some(id)).await? {
            return Err(validation_error(
                "stage_name",
                "this stage name is already used",
            ));
        }
    }

    let mut active: artist::ActiveModel = existing.into();
    if let Some(first_name) = body.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = body.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(stage_name) = body.stage_name {
        active.stage_name = Set(stage_name);
    }
    if let Some(age) = body.age {
        active.age = Set(Some(age));
    }
    if let Some(image_url) = body.image_url {
        active.image_url = Set(Some(image_url));
    }

    let updated = if active.is_changed() {
        active
            .update(&state.db)
            .await
            .map_err(|e| core_error(CoreError::from_update(e)))?
    } else {
        active.try_into_model().map_err(db_error)?
    };

    Ok(Json(ArtistResponse::from(updated)))
}

/// DELETE /api/artists/:id (admin) — removes the artist's songs, albums,
/// biography, and every vote attached to any of them, in one transaction.
pub async fn delete_artist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    artist::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("artist", id))?;

    let songs = song::Entity::find()
        .filter(song::Column::ArtistId.eq(id))
        .all(&txn)
        .await
        .map_err(db_error)?;
    let albums = album::Entity::find()
        .filter(album::Column::ArtistId.eq(id))
        .all(&txn)
        .await
        .map_err(db_error)?;

    let song_ids: Vec<Uuid> = songs.iter().map(|s| s.id).collect();
    let album_ids: HashSet<Uuid> = albums.iter().map(|a| a.id).collect();
    // Albums of other artists that carried this artist's songs: their listen
    // time changes once those songs are gone.
    let foreign_albums: HashSet<Uuid> = songs
        .iter()
        .filter_map(|s| s.album_id)
        .filter(|aid| !album_ids.contains(aid))
        .collect();

    votes::delete_votes_for_subjects(&txn, SubjectKind::Song, &song_ids)
        .await
        .map_err(core_error)?;
    votes::delete_votes_for_subjects(
        &txn,
        SubjectKind::Album,
        &album_ids.iter().copied().collect::<Vec<_>>(),
    )
    .await
    .map_err(core_error)?;
    votes::delete_votes_for_subject(&txn, SubjectKind::Artist, id)
        .await
        .map_err(core_error)?;

    song::Entity::delete_many()
        .filter(song::Column::ArtistId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    album::Entity::delete_many()
        .filter(album::Column::ArtistId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    biography::Entity::delete_many()
        .filter(biography::Column::ArtistId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    artist::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;

    for album_id in foreign_albums {
        aggregates::recompute_album_listen_time(&txn, album_id)
            .await
            .map_err(core_error)?;
    }

    txn.commit().await.map_err(db_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_artist_model() -> artist::Model {
        artist::Model {
            id: Uuid::new_v4(),
            first_name: "Nora".into(),
            last_name: "Vale".into(),
            stage_name: "Nova".into(),
            age: Some(29),
            rating: 4.0,
            image_url: Some("https://img.example.com/nova.jpg".into()),
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn test_artist_response_from_model() {
        let model = make_artist_model();
        let id = model.id;
        let resp = ArtistResponse::from(model);
        assert_eq!(resp.id, id);
        assert_eq!(resp.stage_name, "Nova");
        assert_eq!(resp.rating, 4.0);
    }

    #[test]
    fn test_artist_response_serialization() {
        let model = make_artist_model();
        let resp = ArtistResponse::from(model);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["stage_name"], "Nova");
        assert!(json["image_url"].is_string());
    }

    #[test]
    fn test_search_result_hides_missing_biography() {
        let result = ArtistSearchResult {
            id: Uuid::new_v4(),
            stage_name: "Nova".into(),
            first_name: "Nora".into(),
            last_name: "Vale".into(),
            image_url: None,
            biography_id: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("biography_id").is_none());
    }
}
