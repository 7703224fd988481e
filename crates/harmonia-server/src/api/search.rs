use axum::{
    extract::{Query, State},
    Json,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use harmonia_db::entities::{album, artist, category, song};
use harmonia_db::AppState;

use super::{db_error, ApiError};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct SongSearchResult {
    pub id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub category: Option<String>,
    pub rating: f64,
    pub length_secs: f32,
    pub release_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct AlbumSearchResult {
    pub id: Uuid,
    pub title: String,
    pub artist: Option<String>,
    pub category: Option<String>,
    pub rating: f64,
    pub listen_time_secs: f32,
    pub release_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub songs: Vec<SongSearchResult>,
    pub albums: Vec<AlbumSearchResult>,
    pub artists: Vec<super::artists::ArtistSearchResult>,
}

/// Upper-cased LIKE pattern with SQL wildcards escaped, so user input can
/// never widen the match.
pub(crate) fn like_pattern(q: &str) -> String {
    let escaped = q.trim().to_uppercase().replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

/// GET /api/search?q=… — case-insensitive substring match across songs,
/// albums and artists, each row denormalized with its related names
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, ApiError> {
    let q = params.q.trim();
    if q.is_empty() {
        return Ok(Json(SearchResults {
            songs: vec![],
            albums: vec![],
            artists: vec![],
        }));
    }
    let pattern = like_pattern(q);
    let limit = params.per_page.unwrap_or(10).min(50) as usize;

    let songs = song::Entity::find()
        .filter(Expr::expr(Func::upper(Expr::col(song::Column::Title))).like(&pattern))
        .order_by_desc(song::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .take(limit)
        .collect::<Vec<_>>();

    let albums = album::Entity::find()
        .filter(Expr::expr(Func::upper(Expr::col(album::Column::Title))).like(&pattern))
        .order_by_desc(album::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .take(limit)
        .collect::<Vec<_>>();

    let artists = artist::Entity::find()
        .filter(
            Condition::any()
                .add(Expr::expr(Func::upper(Expr::col(artist::Column::StageName))).like(&pattern))
                .add(Expr::expr(Func::upper(Expr::col(artist::Column::FirstName))).like(&pattern))
                .add(Expr::expr(Func::upper(Expr::col(artist::Column::LastName))).like(&pattern)),
        )
        .order_by_asc(artist::Column::StageName)
        .all(&state.db)
        .await
        .map_err(db_error)?
        .into_iter()
        .take(limit)
        .collect::<Vec<_>>();

    // Denormalize: pull the names the result rows reference.
    let artist_ids: Vec<Uuid> = songs
        .iter()
        .map(|s| s.artist_id)
        .chain(albums.iter().map(|a| a.artist_id))
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
        .chain(albums.iter().map(|a| a.category_id))
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();

    let artist_names: HashMap<Uuid, String> = if !artist_ids.is_empty() {
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
    let album_titles: HashMap<Uuid, String> = if !album_ids.is_empty() {
        album::Entity::find()
            .filter(album::Column::Id.is_in(album_ids))
            .all(&state.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|a| (a.id, a.title))
            .collect()
    } else {
        HashMap::new()
    };
    let category_names: HashMap<Uuid, String> = if !category_ids.is_empty() {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(&state.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect()
    } else {
        HashMap::new()
    };

    let artist_results_ids: Vec<Uuid> = artists.iter().map(|a| a.id).collect();
    let bios: HashMap<Uuid, Uuid> = if !artist_results_ids.is_empty() {
        harmonia_db::entities::biography::Entity::find()
            .filter(
                harmonia_db::entities::biography::Column::ArtistId.is_in(artist_results_ids),
            )
            .all(&state.db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|b| (b.artist_id, b.id))
            .collect()
    } else {
        HashMap::new()
    };

    Ok(Json(SearchResults {
        songs: songs
            .into_iter()
            .map(|s| SongSearchResult {
                id: s.id,
                artist: artist_names.get(&s.artist_id).cloned(),
                album: s.album_id.and_then(|id| album_titles.get(&id).cloned()),
                category: category_names.get(&s.category_id).cloned(),
                title: s.title,
                rating: s.rating,
                length_secs: s.length_secs,
                release_date: s.release_date,
            })
            .collect(),
        albums: albums
            .into_iter()
            .map(|a| AlbumSearchResult {
                id: a.id,
                artist: artist_names.get(&a.artist_id).cloned(),
                category: category_names.get(&a.category_id).cloned(),
                title: a.title,
                rating: a.rating,
                listen_time_secs: a.listen_time_secs,
                release_date: a.release_date,
            })
            .collect(),
        artists: artists
            .into_iter()
            .map(|a| super::artists::ArtistSearchResult {
                biography_id: bios.get(&a.id).copied(),
                id: a.id,
                stage_name: a.stage_name,
                first_name: a.first_name,
                last_name: a.last_name,
                image_url: a.image_url,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_uppercases_and_wraps() {
        assert_eq!(like_pattern("love"), "%LOVE%");
        assert_eq!(like_pattern("  love  "), "%LOVE%");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%A\\_B%");
    }

    #[test]
    fn test_search_params_deserialization() {
        let params: SearchParams = serde_json::from_str(r#"{"q": "love", "per_page": 25}"#).unwrap();
        assert_eq!(params.q, "love");
        assert_eq!(params.per_page, Some(25));
    }

    #[test]
    fn test_search_results_serialization() {
        let results = SearchResults {
            songs: vec![],
            albums: vec![],
            artists: vec![],
        };
        let json = serde_json::to_value(&results).unwrap();
        assert!(json["songs"].as_array().unwrap().is_empty());
        assert!(json["albums"].as_array().unwrap().is_empty());
        assert!(json["artists"].as_array().unwrap().is_empty());
    }
}
