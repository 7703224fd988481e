//! The vote ledger.
//!
//! Owns the single-vote-per-(subject, voter) invariant. The ledger checks for
//! an existing row itself — callers may consult [`has_voted`] for UI purposes
//! but correctness never depends on them doing so. Insert races on the same
//! key are caught by the unique index on `(subject_kind, subject_id,
//! voter_id)` and absorbed as an update of the surviving row.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use uuid::Uuid;

use harmonia_db::entities::{vote, SubjectKind};

use crate::aggregates;
use crate::error::CoreError;

pub const MIN_SCORE: i16 = 1;
pub const MAX_SCORE: i16 = 5;

/// What a cast did, and the subject's rating after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteOutcome {
    /// true when a new vote row was created, false for a revote.
    pub created: bool,
    pub new_rating: f64,
}

/// Cast a voter's score for a subject, or update their existing vote in
/// place. Recomputes and persists the subject's rating before returning.
pub async fn cast_or_update_vote<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_id: Uuid,
    voter_id: &str,
    score: i16,
) -> Result<VoteOutcome, CoreError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(CoreError::InvalidScore(score));
    }
    if !aggregates::subject_exists(conn, kind, subject_id).await? {
        return Err(CoreError::NotFound(kind.as_str(), subject_id));
    }

    let created = match find_vote(conn, kind, subject_id, voter_id).await? {
        Some(existing) => {
            update_score(conn, existing, score).await?;
            false
        }
        None => {
            let row = vote::ActiveModel {
                id: Set(Uuid::new_v4()),
                subject_kind: Set(kind),
                subject_id: Set(subject_id),
                voter_id: Set(voter_id.to_owned()),
                score: Set(score),
                created_at: Set(chrono::Utc::now().fixed_offset()),
            };
            match row.insert(conn).await {
                Ok(_) => true,
                Err(err)
                    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    // Lost an insert race for this (kind, subject, voter);
                    // land on the surviving row as a score update.
                    tracing::debug!(%subject_id, voter_id, "duplicate vote insert absorbed");
                    let survivor = find_vote(conn, kind, subject_id, voter_id)
                        .await?
                        .ok_or(CoreError::Conflict)?;
                    update_score(conn, survivor, score).await?;
                    false
                }
                Err(err) => return Err(err.into()),
            }
        }
    };

    let new_rating = aggregates::recompute_subject_rating(conn, kind, subject_id).await?;
    Ok(VoteOutcome { created, new_rating })
}

/// Has this voter already voted on this subject? Pure read.
pub async fn has_voted<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_id: Uuid,
    voter_id: &str,
) -> Result<bool, CoreError> {
    let count = vote::Entity::find()
        .filter(vote::Column::SubjectKind.eq(kind))
        .filter(vote::Column::SubjectId.eq(subject_id))
        .filter(vote::Column::VoterId.eq(voter_id))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Remove every vote for a subject. Called from subject-deleting operations,
/// inside the same transaction that removes the subject itself.
pub async fn delete_votes_for_subject<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_id: Uuid,
) -> Result<u64, CoreError> {
    let res = vote::Entity::delete_many()
        .filter(vote::Column::SubjectKind.eq(kind))
        .filter(vote::Column::SubjectId.eq(subject_id))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

/// Bulk form of [`delete_votes_for_subject`] for cascade deletes that remove
/// many subjects of one kind at once.
pub async fn delete_votes_for_subjects<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_ids: &[Uuid],
) -> Result<u64, CoreError> {
    if subject_ids.is_empty() {
        return Ok(0);
    }
    let res = vote::Entity::delete_many()
        .filter(vote::Column::SubjectKind.eq(kind))
        .filter(vote::Column::SubjectId.is_in(subject_ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(res.rows_affected)
}

async fn find_vote<C: ConnectionTrait>(
    conn: &C,
    kind: SubjectKind,
    subject_id: Uuid,
    voter_id: &str,
) -> Result<Option<vote::Model>, CoreError> {
    Ok(vote::Entity::find()
        .filter(vote::Column::SubjectKind.eq(kind))
        .filter(vote::Column::SubjectId.eq(subject_id))
        .filter(vote::Column::VoterId.eq(voter_id))
        .one(conn)
        .await?)
}

async fn update_score<C: ConnectionTrait>(
    conn: &C,
    existing: vote::Model,
    score: i16,
) -> Result<(), CoreError> {
    if existing.score == score {
        return Ok(());
    }
    let mut active: vote::ActiveModel = existing.into();
    active.score = Set(score);
    active.update(conn).await.map_err(CoreError::from_update)?;
    Ok(())
}
