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
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use harmonia_core::{aggregates, reassign, votes, CoreError};
use harmonia_db::entities::{album, artist, category, song, SubjectKind};
use harmonia_db::AppState;

use super::songs::{enrich_songs, PaginatedResponse, SongResponse};
use super::{core_error, db_error, not_found, validation_error, ApiError};

#[derive(Debug, Serialize)]
pub struct AlbumResponse {
    pub id: Uuid,
    pub title: String,
    pub artist_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    pub category_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub listen_time_secs: f32,
    pub rating: f64,
    pub release_date: Option<chrono::NaiveDate>,
    pub cover_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl AlbumResponse {
    pub fn from_model(
        a: album::Model,
        artist_name: Option<String>,
        category_name: Option<String>,
    ) -> Self {
        Self {
            id: a.id,
            title: a.title,
            artist_id: a.artist_id,
            artist_name,
            category_id: a.category_id,
            category_name,
            listen_time_secs: a.listen_time_secs,
            rating: a.rating,
            release_date: a.release_date,
            cover_url: a.cover_url,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlbumDetailResponse {
    #[serde(flatten)]
    pub album: AlbumResponse,
    pub songs: Vec<SongResponse>,
}

/// Case-insensitive "this artist already has an album with this title".
async fn album_title_taken<C: ConnectionTrait>(
    conn: &C,
    artist_id: Uuid,
    title: &str,
    exclude: Option<Uuid>,
) -> Result<bool, ApiError> {
    let mut query = album::Entity::find()
        .filter(album::Column::ArtistId.eq(artist_id))
        .filter(
            Expr::expr(Func::upper(Expr::col(album::Column::Title))).eq(title.to_uppercase()),
        );
    if let Some(id) = exclude {
        query = query.filter(album::Column::Id.ne(id));
    }
    Ok(query.count(conn).await.map_err(db_error)? > 0)
}

async fn join_names<C: ConnectionTrait>(
    conn: &C,
    albums: &[album::Model],
) -> Result<(HashMap<Uuid, String>, HashMap<Uuid, String>), ApiError> {
    let artist_ids: Vec<Uuid> = albums
        .iter()
        .map(|a| a.artist_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let category_ids: Vec<Uuid> = albums
        .iter()
        .map(|a| a.category_id)
        .collect::<HashSet<_>>()
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
    Ok((artists, categories))
}

#[derive(Debug, Deserialize)]
pub struct AlbumListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub artist_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

/// GET /api/albums — optionally narrowed by artist and/or category
pub async fn list_albums(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlbumListParams>,
) -> Result<Json<PaginatedResponse<AlbumResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);

    let mut query = album::Entity::find().order_by_desc(album::Column::CreatedAt);
    if let Some(artist_id) = params.artist_id {
        query = query.filter(album::Column::ArtistId.eq(artist_id));
    }
    if let Some(category_id) = params.category_id {
        query = query.filter(album::Column::CategoryId.eq(category_id));
    }

    let paginator = query.paginate(&state.db, per_page);
    let total = paginator.num_items().await.map_err(db_error)?;
    let albums = paginator.fetch_page(page - 1).await.map_err(db_error)?;
    let total_pages = total.div_ceil(per_page);

    let (artists, categories) = join_names(&state.db, &albums).await?;

    Ok(Json(PaginatedResponse {
        data: albums
            .into_iter()
            .map(|a| {
                let artist_name = artists.get(&a.artist_id).cloned();
                let category_name = categories.get(&a.category_id).cloned();
                AlbumResponse::from_model(a, artist_name, category_name)
            })
            .collect(),
        total,
        page,
        per_page,
        total_pages,
    }))
}

/// GET /api/albums/:id — the album plus its current songs
pub async fn get_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlbumDetailResponse>, ApiError> {
    let album_model = album::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("album", id))?;

    let songs = song::Entity::find()
        .filter(song::Column::AlbumId.eq(id))
        .order_by_asc(song::Column::Title)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let (artists, categories) = join_names(&state.db, std::slice::from_ref(&album_model)).await?;
    let artist_name = artists.get(&album_model.artist_id).cloned();
    let category_name = categories.get(&album_model.category_id).cloned();

    Ok(Json(AlbumDetailResponse {
        album: AlbumResponse::from_model(album_model, artist_name, category_name),
        songs: enrich_songs(&state.db, songs).await?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateAlbumRequest {
    pub title: String,
    pub artist_id: Uuid,
    pub category_id: Uuid,
    pub release_date: Option<chrono::NaiveDate>,
    pub cover_url: Option<String>,
    /// Songs to pull onto the new album; each goes through the
    /// reassignment coordinator so its previous album stays consistent.
    #[serde(default)]
    pub song_ids: Vec<Uuid>,
}

/// POST /api/albums (admin)
pub async fn create_album(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAlbumRequest>,
) -> Result<(StatusCode, Json<AlbumResponse>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(validation_error("title", "title is required"));
    }

    let txn = state.db.begin().await.map_err(db_error)?;

    let artist_model = artist::Entity::find_by_id(body.artist_id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("artist", body.artist_id))?;
    let category_model = category::Entity::find_by_id(body.category_id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("category", body.category_id))?;

    if album_title_taken(&txn, body.artist_id, &body.title, None).await? {
        return Err(validation_error(
            "title",
            format!(
                "{} already has an album named '{}'",
                artist_model.stage_name, body.title
            ),
        ));
    }

    let inserted = album::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(body.title),
        artist_id: Set(body.artist_id),
        category_id: Set(body.category_id),
        listen_time_secs: Set(0.0),
        rating: Set(0.0),
        release_date: Set(body.release_date),
        cover_url: Set(body.cover_url),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;

    for song_id in &body.song_ids {
        reassign::apply_reassignment(&txn, *song_id, Some(inserted.id))
            .await
            .map_err(core_error)?;
    }
    aggregates::recompute_biography_stats(&txn, body.artist_id)
        .await
        .map_err(core_error)?;

    // Reread to pick up the listen time the reassignments just wrote.
    let fresh = album::Entity::find_by_id(inserted.id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("album", inserted.id))?;

    txn.commit().await.map_err(db_error)?;
    Ok((
        StatusCode::CREATED,
        Json(AlbumResponse::from_model(
            fresh,
            Some(artist_model.stage_name),
            Some(category_model.name),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlbumRequest {
    pub title: Option<String>,
    pub artist_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub release_date: Option<chrono::NaiveDate>,
    pub cover_url: Option<String>,
    /// When present, the full desired song set: songs not listed are moved
    /// off the album, listed songs are moved onto it.
    pub song_ids: Option<Vec<Uuid>>,
}

/// PUT /api/albums/:id (admin)
pub async fn update_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAlbumRequest>,
) -> Result<Json<AlbumResponse>, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    let existing = album::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("album", id))?;
    let old_artist_id = existing.artist_id;

    let effective_artist = body.artist_id.unwrap_or(existing.artist_id);
    let effective_title = body.title.clone().unwrap_or_else(|| existing.title.clone());
    if body.title.is_some() || body.artist_id.is_some() {
        if album_title_taken(&txn, effective_artist, &effective_title, Some(id)).await? {
            let stage_name = artist::Entity::find_by_id(effective_artist)
                .one(&txn)
                .await
                .map_err(db_error)?
                .map(|a| a.stage_name)
                .unwrap_or_default();
            return Err(validation_error(
                "title",
                format!("{stage_name} already has an album named '{effective_title}'"),
            ));
        }
    }

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

    let mut active: album::ActiveModel = existing.into();
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
    if let Some(release_date) = body.release_date {
        active.release_date = Set(Some(release_date));
    }
    if let Some(cover_url) = body.cover_url {
        active.cover_url = Set(Some(cover_url));
    }
    let updated = if active.is_changed() {
        active
            .update(&txn)
            .await
            .map_err(|e| core_error(CoreError::from_update(e)))?
    } else {
        active.try_into_model().map_err(db_error)?
    };

    if let Some(ref desired) = body.song_ids {
        let desired_set: HashSet<Uuid> = desired.iter().copied().collect();
        let current = song::Entity::find()
            .filter(song::Column::AlbumId.eq(id))
            .all(&txn)
            .await
            .map_err(db_error)?;

        for s in &current {
            if !desired_set.contains(&s.id) {
                reassign::apply_reassignment(&txn, s.id, None)
                    .await
                    .map_err(core_error)?;
            }
        }
        for song_id in &desired_set {
            // No-op for songs already on this album.
            reassign::apply_reassignment(&txn, *song_id, Some(id))
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

    let fresh = album::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("album", id))?;
    let (artists, categories) = join_names(&txn, std::slice::from_ref(&fresh)).await?;
    let artist_name = artists.get(&fresh.artist_id).cloned();
    let category_name = categories.get(&fresh.category_id).cloned();

    txn.commit().await.map_err(db_error)?;
    Ok(Json(AlbumResponse::from_model(
        fresh,
        artist_name,
        category_name,
    )))
}

/// DELETE /api/albums/:id (admin) — votes go with the album, its songs
/// become unaffiliated
pub async fn delete_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    let existing = album::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("album", id))?;

    votes::delete_votes_for_subject(&txn, SubjectKind::Album, id)
        .await
        .map_err(core_error)?;

    song::Entity::update_many()
        .col_expr(song::Column::AlbumId, Expr::value(Option::<Uuid>::None))
        .filter(song::Column::AlbumId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;

    album::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;

    aggregates::recompute_biography_stats(&txn, existing.artist_id)
        .await
        .map_err(core_error)?;

    txn.commit().await.map_err(db_error)?;
    Ok(StatusCode::NO_CONTENT)
}
