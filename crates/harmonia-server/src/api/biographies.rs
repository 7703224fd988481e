use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait, TryIntoModel,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use harmonia_core::{aggregates, CoreError};
use harmonia_db::entities::{artist, biography, SubjectKind};
use harmonia_db::AppState;

use super::songs::{PaginatedResponse, PaginationParams};
use super::{core_error, db_error, not_found, validation_error, ApiError};

#[derive(Debug, Serialize)]
pub struct BiographyResponse {
    pub id: Uuid,
    pub artist_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_stage_name: Option<String>,
    pub early_life: Option<String>,
    pub career: Option<String>,
    pub artistry: Option<String>,
    pub personal_life: Option<String>,
    pub number_of_songs: i32,
    pub number_of_albums: i32,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl BiographyResponse {
    pub fn from_model(b: biography::Model, artist_stage_name: Option<String>) -> Self {
        Self {
            id: b.id,
            artist_id: b.artist_id,
            artist_stage_name,
            early_life: b.early_life,
            career: b.career,
            artistry: b.artistry,
            personal_life: b.personal_life,
            number_of_songs: b.number_of_songs,
            number_of_albums: b.number_of_albums,
            created_at: b.created_at,
        }
    }
}

/// GET /api/biographies — refreshes every biography's counts first, the way
/// the listing page always showed live numbers
pub async fn list_biographies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<BiographyResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);

    let txn = state.db.begin().await.map_err(db_error)?;
    let all = biography::Entity::find().all(&txn).await.map_err(db_error)?;
    for bio in &all {
        aggregates::recompute_biography_stats(&txn, bio.artist_id)
            .await
            .map_err(core_error)?;
    }
    txn.commit().await.map_err(db_error)?;

    let paginator = biography::Entity::find()
        .order_by_asc(biography::Column::CreatedAt)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await.map_err(db_error)?;
    let bios = paginator.fetch_page(page - 1).await.map_err(db_error)?;
    let total_pages = total.div_ceil(per_page);

    let artist_ids: Vec<Uuid> = bios.iter().map(|b| b.artist_id).collect();
    let names: HashMap<Uuid, String> = if !artist_ids.is_empty() {
        artist::Entity::find()
            .filter(artist::Column::Id.is_in(artist_ids))
            .all(&state.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|a| (a.id, a.stage_name))
            .collect()
    } else {
        HashMap::new()
    };

    Ok(Json(PaginatedResponse {
        data: bios
            .into_iter()
            .map(|b| {
                let name = names.get(&b.artist_id).cloned();
                BiographyResponse::from_model(b, name)
            })
            .collect(),
        total,
        page,
        per_page,
        total_pages,
    }))
}

/// GET /api/biographies/:id
pub async fn get_biography(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BiographyResponse>, ApiError> {
    let model = biography::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("biography", id))?;

    let name = artist::Entity::find_by_id(model.artist_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .map(|a| a.stage_name);

    Ok(Json(BiographyResponse::from_model(model, name)))
}

#[derive(Debug, Deserialize)]
pub struct CreateBiographyRequest {
    pub artist_id: Uuid,
    pub early_life: Option<String>,
    pub career: Option<String>,
    pub artistry: Option<String>,
    pub personal_life: Option<String>,
}

/// POST /api/biographies (admin) — one per artist
pub async fn create_biography(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBiographyRequest>,
) -> Result<(StatusCode, Json<BiographyResponse>), ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    let artist_model = artist::Entity::find_by_id(body.artist_id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("artist", body.artist_id))?;

    let exists = biography::Entity::find()
        .filter(biography::Column::ArtistId.eq(body.artist_id))
        .count(&txn)
        .await
        .map_err(db_error)?;
    if exists > 0 {
        return Err(validation_error(
            "artist_id",
            "this artist already has a biography",
        ));
    }

    let inserted = biography::ActiveModel {
        id: Set(Uuid::new_v4()),
        artist_id: Set(body.artist_id),
        early_life: Set(body.early_life),
        career: Set(body.career),
        artistry: Set(body.artistry),
        personal_life: Set(body.personal_life),
        number_of_songs: Set(0),
        number_of_albums: Set(0),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        // Concurrent create for the same artist beat us to the unique index.
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            validation_error("artist_id", "this artist already has a biography")
        }
        _ => db_error(e),
    })?;

    aggregates::recompute_biography_stats(&txn, body.artist_id)
        .await
        .map_err(core_error)?;

    let fresh = biography::Entity::find_by_id(inserted.id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("biography", inserted.id))?;

    txn.commit().await.map_err(db_error)?;
    Ok((
        StatusCode::CREATED,
        Json(BiographyResponse::from_model(
            fresh,
            Some(artist_model.stage_name),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBiographyRequest {
    pub artist_id: Option<Uuid>,
    pub early_life: Option<String>,
    pub career: Option<String>,
    pub artistry: Option<String>,
    pub personal_life: Option<String>,
}

/// PUT /api/biographies/:id (admin)
pub async fn update_biography(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBiographyRequest>,
) -> Result<Json<BiographyResponse>, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    let existing = biography::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("biography", id))?;

    if let Some(new_artist) = body.artist_id {
        if new_artist != existing.artist_id {
            if !aggregates::subject_exists(&txn, SubjectKind::Artist, new_artist)
                .await
                .map_err(core_error)?
            {
                return Err(not_found("artist", new_artist));
            }
            let taken = biography::Entity::find()
                .filter(biography::Column::ArtistId.eq(new_artist))
                .count(&txn)
                .await
                .map_err(db_error)?;
            if taken > 0 {
                return Err(validation_error(
                    "artist_id",
                    "this artist already has a biography",
                ));
            }
        }
    }

    let mut active: biography::ActiveModel = existing.into();
    if let Some(artist_id) = body.artist_id {
        active.artist_id = Set(artist_id);
    }
    if let Some(early_life) = body.early_life {
        active.early_life = Set(Some(early_life));
    }
    if let Some(career) = body.career {
        active.career = Set(Some(career));
    }
    if let Some(artistry) = body.artistry {
        active.artistry = Set(Some(artistry));
    }
    if let Some(personal_life) = body.personal_life {
        active.personal_life = Set(Some(personal_life));
    }
    let updated = if active.is_changed() {
        active
            .update(&txn)
            .await
            .map_err(|e| core_error(CoreError::from_update(e)))?
    } else {
        active.try_into_model().map_err(db_error)?
    };

    // Counts always track the (possibly new) artist's live catalog.
    aggregates::recompute_biography_stats(&txn, updated.artist_id)
        .await
        .map_err(core_error)?;

    let fresh = biography::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("biography", id))?;
    let name = artist::Entity::find_by_id(fresh.artist_id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .map(|a| a.stage_name);

    txn.commit().await.map_err(db_error)?;
    Ok(Json(BiographyResponse::from_model(fresh, name)))
}

/// DELETE /api/biographies/:id (admin)
pub async fn delete_biography(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let res = biography::Entity::delete_by_id(id)
        .exec(&state.db)
        .await
        .map_err(db_error)?;
    if res.rows_affected == 0 {
        return Err(not_found("biography", id));
    }
    Ok(StatusCode::NO_CONTENT)
}
