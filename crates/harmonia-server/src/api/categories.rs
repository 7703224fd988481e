use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use harmonia_core::{aggregates, votes, CoreError};
use harmonia_db::entities::{album, category, song, SubjectKind};
use harmonia_db::AppState;

use super::songs::{PaginatedResponse, PaginationParams};
use super::{core_error, db_error, not_found, validation_error, ApiError};

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub rating: f64,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<category::Model> for CategoryResponse {
    fn from(c: category::Model) -> Self {
        Self {
            id: c.id,
            name: c.name,
            rating: c.rating,
            created_at: c.created_at,
        }
    }
}

/// Names live upper-cased, so equality on the upper-cased input is the
/// case-insensitive uniqueness check.
async fn name_taken<C: sea_orm::ConnectionTrait>(
    conn: &C,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<bool, ApiError> {
    let mut query = category::Entity::find().filter(category::Column::Name.eq(name.to_uppercase()));
    if let Some(id) = exclude {
        query = query.filter(category::Column::Id.ne(id));
    }
    Ok(query.count(conn).await.map_err(db_error)? > 0)
}

/// GET /api/categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<CategoryResponse>>, ApiError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).min(100);

    let paginator = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await.map_err(db_error)?;
    let categories = paginator.fetch_page(page - 1).await.map_err(db_error)?;
    let total_pages = total.div_ceil(per_page);

    Ok(Json(PaginatedResponse {
        data: categories.into_iter().map(CategoryResponse::from).collect(),
        total,
        page,
        per_page,
        total_pages,
    }))
}

/// GET /api/categories/:id
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let model = category::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("category", id))?;
    Ok(Json(CategoryResponse::from(model)))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// POST /api/categories (admin)
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(validation_error("name", "name is required"));
    }
    if name_taken(&state.db, name, None).await? {
        return Err(validation_error("name", "category already exists"));
    }

    let model = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_uppercase()),
        rating: Set(0.0),
        created_at: Set(chrono::Utc::now().fixed_offset()),
    }
    .insert(&state.db)
    .await
    .map_err(db_error)?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(model))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
}

/// PUT /api/categories/:id (admin) — renaming is blocked while songs or
/// albums still reference the category
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryResponse>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(validation_error("name", "name is required"));
    }

    let existing = category::Entity::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("category", id))?;

    let song_refs = song::Entity::find()
        .filter(song::Column::CategoryId.eq(id))
        .count(&state.db)
        .await
        .map_err(db_error)?;
    let album_refs = album::Entity::find()
        .filter(album::Column::CategoryId.eq(id))
        .count(&state.db)
        .await
        .map_err(db_error)?;
    if song_refs > 0 || album_refs > 0 {
        return Err(validation_error(
            "name",
            "some songs or albums still reference this category, change their category and try again",
        ));
    }

    if name_taken(&state.db, name, Some(id)).await? {
        return Err(validation_error("name", "category already exists"));
    }

    let mut active: category::ActiveModel = existing.into();
    active.name = Set(name.to_uppercase());
    let updated = active
        .update(&state.db)
        .await
        .map_err(|e| core_error(CoreError::from_update(e)))?;

    Ok(Json(CategoryResponse::from(updated)))
}

/// DELETE /api/categories/:id (admin) — takes the category's songs and
/// albums with it (and their votes); albums elsewhere that lose songs get
/// their listen time recomputed, affected artists their biography stats.
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    category::Entity::find_by_id(id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("category", id))?;

    let songs = song::Entity::find()
        .filter(song::Column::CategoryId.eq(id))
        .all(&txn)
        .await
        .map_err(db_error)?;
    let albums = album::Entity::find()
        .filter(album::Column::CategoryId.eq(id))
        .all(&txn)
        .await
        .map_err(db_error)?;

    let song_ids: Vec<Uuid> = songs.iter().map(|s| s.id).collect();
    let deleted_album_ids: HashSet<Uuid> = albums.iter().map(|a| a.id).collect();
    let surviving_albums: HashSet<Uuid> = songs
        .iter()
        .filter_map(|s| s.album_id)
        .filter(|aid| !deleted_album_ids.contains(aid))
        .collect();
    let affected_artists: HashSet<Uuid> = songs
        .iter()
        .map(|s| s.artist_id)
        .chain(albums.iter().map(|a| a.artist_id))
        .collect();

    votes::delete_votes_for_subjects(&txn, SubjectKind::Song, &song_ids)
        .await
        .map_err(core_error)?;
    votes::delete_votes_for_subjects(
        &txn,
        SubjectKind::Album,
        &deleted_album_ids.iter().copied().collect::<Vec<_>>(),
    )
    .await
    .map_err(core_error)?;
    votes::delete_votes_for_subject(&txn, SubjectKind::Category, id)
        .await
        .map_err(core_error)?;

    song::Entity::delete_many()
        .filter(song::Column::CategoryId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    album::Entity::delete_many()
        .filter(album::Column::CategoryId.eq(id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    category::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(db_error)?;

    for album_id in surviving_albums {
        aggregates::recompute_album_listen_time(&txn, album_id)
            .await
            .map_err(core_error)?;
    }
    for artist_id in affected_artists {
        aggregates::recompute_biography_stats(&txn, artist_id)
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

    #[test]
    fn test_category_response_serialization() {
        let model = category::Model {
            id: Uuid::new_v4(),
            name: "ROCK".into(),
            rating: 0.0,
            created_at: Utc::now().fixed_offset(),
        };
        let resp = CategoryResponse::from(model);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["name"], "ROCK");
        assert_eq!(json["rating"], 0.0);
    }

    #[test]
    fn test_create_request_deserialization() {
        let req: CreateCategoryRequest = serde_json::from_str(r#"{"name": "jazz"}"#).unwrap();
        assert_eq!(req.name, "jazz");
    }
}
