//! Recomputation of stored derived values.
//!
//! Each function reads the live source set and writes the derived column
//! back, so calling one twice with no intervening membership change is a
//! no-op. They are invoked after every membership-changing write, never
//! from a cache.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QuerySelect,
};
use uuid::Uuid;

use harmonia_db::entities::{album, artist, biography, category, song, vote, SubjectKind};

use crate::error::CoreError;

/// Check that the subject of a vote (or any referenced entity) exists.
pub async fn subject_exists<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_id: Uuid,
) -> Result<bool, CoreError> {
    let count = match kind {
        SubjectKind::Song => song::Entity::find_by_id(subject_id).count(conn).await?,
        SubjectKind::Album => album::Entity::find_by_id(subject_id).count(conn).await?,
        SubjectKind::Artist => artist::Entity::find_by_id(subject_id).count(conn).await?,
        SubjectKind::Category => category::Entity::find_by_id(subject_id).count(conn).await?,
    };
    Ok(count > 0)
}

#[derive(Debug, FromQueryResult)]
struct LengthRow {
    length_secs: f32,
}

/// Recompute an album's listen time from the songs currently assigned to it
/// and persist the total. An empty song set is a valid zero, not an error.
pub async fn recompute_album_listen_time<C: ConnectionTrait>(
    conn: &C,
    album_id: Uuid,
) -> Result<f32, CoreError> {
    let rows = song::Entity::find()
        .select_only()
        .column(song::Column::LengthSecs)
        .filter(song::Column::AlbumId.eq(album_id))
        .into_model::<LengthRow>()
        .all(conn)
        .await?;

    let total: f32 = rows.iter().map(|r| r.length_secs).sum();

    let res = album::Entity::update_many()
        .col_expr(album::Column::ListenTimeSecs, Expr::value(total))
        .filter(album::Column::Id.eq(album_id))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Err(CoreError::NotFound("album", album_id));
    }

    tracing::debug!(%album_id, listen_time_secs = total, "album listen time recomputed");
    Ok(total)
}

/// Refresh a biography's song/album counts from the artist's live catalog.
/// Artists without a biography are a no-op — biographies are optional.
pub async fn recompute_biography_stats<C: ConnectionTrait>(
    conn: &C,
    artist_id: Uuid,
) -> Result<(), CoreError> {
    let Some(bio) = biography::Entity::find()
        .filter(biography::Column::ArtistId.eq(artist_id))
        .one(conn)
        .await?
    else {
        return Ok(());
    };

    let number_of_songs = song::Entity::find()
        .filter(song::Column::ArtistId.eq(artist_id))
        .count(conn)
        .await?;
    let number_of_albums = album::Entity::find()
        .filter(album::Column::ArtistId.eq(artist_id))
        .count(conn)
        .await?;

    let res = biography::Entity::update_many()
        .col_expr(biography::Column::NumberOfSongs, Expr::value(number_of_songs as i32))
        .col_expr(biography::Column::NumberOfAlbums, Expr::value(number_of_albums as i32))
        .filter(biography::Column::Id.eq(bio.id))
        .exec(conn)
        .await?;
    if res.rows_affected == 0 {
        return Err(CoreError::Conflict);
    }

    Ok(())
}

#[derive(Debug, FromQueryResult)]
struct ScoreRow {
    score: i16,
}

/// Recompute a subject's rating as the mean of its votes and persist it.
pub async fn recompute_subject_rating<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_id: Uuid,
) -> Result<f64, CoreError> {
    let rows = vote::Entity::find()
        .select_only()
        .column(vote::Column::Score)
        .filter(vote::Column::SubjectKind.eq(kind))
        .filter(vote::Column::SubjectId.eq(subject_id))
        .into_model::<ScoreRow>()
        .all(conn)
        .await?;

    let scores: Vec<i16> = rows.iter().map(|r| r.score).collect();
    let rating = mean_rating(&scores);

    let rows_affected = match kind {
        SubjectKind::Song => {
            song::Entity::update_many()
                .col_expr(song::Column::Rating, Expr::value(rating))
                .filter(song::Column::Id.eq(subject_id))
                .exec(conn)
                .await?
                .rows_affected
        }
        SubjectKind::Album => {
            album::Entity::update_many()
                .col_expr(album::Column::Rating, Expr::value(rating))
                .filter(album::Column::Id.eq(subject_id))
                .exec(conn)
                .await?
                .rows_affected
        }
        SubjectKind::Artist => {
            artist::Entity::update_many()
                .col_expr(artist::Column::Rating, Expr::value(rating))
                .filter(artist::Column::Id.eq(subject_id))
                .exec(conn)
                .await?
                .rows_affected
        }
        SubjectKind::Category => {
            category::Entity::update_many()
                .col_expr(category::Column::Rating, Expr::value(rating))
                .filter(category::Column::Id.eq(subject_id))
                .exec(conn)
                .await?
                .rows_affected
        }
    };
    if rows_affected == 0 {
        return Err(CoreError::NotFound(kind.as_str(), subject_id));
    }

    Ok(rating)
}

/// Mean of the scores, rounded to one decimal (the star-display convention).
/// No votes yet means 0.0.
pub(crate) fn mean_rating(scores: &[i16]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
    let mean = sum as f64 / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}
