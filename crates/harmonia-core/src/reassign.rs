//! The reassignment coordinator.
//!
//! Moving a song between albums touches up to three rows: the song's
//! reference and the listen time of both the losing and the gaining album.
//! The reference is updated first, so the old album's recompute reads a
//! membership that already excludes the moved song and the new album's
//! recompute reads one that includes it.

use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set, TransactionTrait};
use uuid::Uuid;

use harmonia_db::entities::{album, song};

use crate::aggregates;
use crate::error::CoreError;

/// Listen times recomputed by a move. `None` on either side means that side
/// had no album (or nothing moved at all).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reassignment {
    pub old_album_listen_time: Option<f32>,
    pub new_album_listen_time: Option<f32>,
}

/// Move a song to `new_album_id` (or to no album) inside its own
/// transaction. Entry point for the dedicated reassignment endpoint.
pub async fn reassign_song_album(
    db: &DatabaseConnection,
    song_id: Uuid,
    new_album_id: Option<Uuid>,
) -> Result<Reassignment, CoreError> {
    let txn = db.begin().await?;
    let outcome = apply_reassignment(&txn, song_id, new_album_id).await?;
    txn.commit().await?;
    Ok(outcome)
}

/// The move itself, on a caller-provided connection. Song create/edit and
/// album create/edit run this inside their own transactions, once per song
/// whose membership changes; a failure anywhere rolls the whole request
/// back, so listen times never drift from actual membership.
pub async fn apply_reassignment<C: ConnectionTrait>(
    conn: &C,
    song_id: Uuid,
    new_album_id: Option<Uuid>,
) -> Result<Reassignment, CoreError> {
    let song_model = song::Entity::find_by_id(song_id)
        .one(conn)
        .await?
        .ok_or(CoreError::NotFound("song", song_id))?;

    // Reject before any write when the target does not exist.
    if let Some(target) = new_album_id {
        if album::Entity::find_by_id(target).count(conn).await? == 0 {
            return Err(CoreError::NotFound("album", target));
        }
    }

    let old_album_id = song_model.album_id;
    if old_album_id == new_album_id {
        // Not an actual move; skip the recomputes entirely.
        return Ok(Reassignment {
            old_album_listen_time: None,
            new_album_listen_time: None,
        });
    }

    let mut active: song::ActiveModel = song_model.into();
    active.album_id = Set(new_album_id);
    active.update(conn).await.map_err(CoreError::from_update)?;

    let old_album_listen_time = match old_album_id {
        Some(id) => Some(aggregates::recompute_album_listen_time(conn, id).await?),
        None => None,
    };
    let new_album_listen_time = match new_album_id {
        Some(id) => Some(aggregates::recompute_album_listen_time(conn, id).await?),
        None => None,
    };

    tracing::debug!(
        %song_id,
        ?old_album_id,
        ?new_album_id,
        "song album membership updated"
    );

    Ok(Reassignment {
        old_album_listen_time,
        new_album_listen_time,
    })
}
