use axum::{
    extract::{Query, State},
    Extension, Json,
};
use sea_orm::{ConnectionTrait, EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use harmonia_core::{votes, CoreError};
use harmonia_db::entities::{biography, SubjectKind};
use harmonia_db::AppState;

use crate::identity::Identity;

use super::{core_error, db_error, ApiError};

/// What clients may vote on. A biography has no rating of its own — a vote
/// on one lands on the artist it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteSubject {
    Song,
    Album,
    Artist,
    Category,
    Biography,
}

async fn resolve_subject<C: ConnectionTrait>(
    conn: &C,
    subject: VoteSubject,
    subject_id: Uuid,
) -> Result<(SubjectKind, Uuid), CoreError> {
    match subject {
        VoteSubject::Song => Ok((SubjectKind::Song, subject_id)),
        VoteSubject::Album => Ok((SubjectKind::Album, subject_id)),
        VoteSubject::Artist => Ok((SubjectKind::Artist, subject_id)),
        VoteSubject::Category => Ok((SubjectKind::Category, subject_id)),
        VoteSubject::Biography => {
            let bio = biography::Entity::find_by_id(subject_id)
                .one(conn)
                .await?
                .ok_or(CoreError::NotFound("biography", subject_id))?;
            Ok((SubjectKind::Artist, bio.artist_id))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub subject_kind: VoteSubject,
    pub subject_id: Uuid,
    pub score: i16,
}

#[derive(Debug, Serialize)]
pub struct CastVoteResponse {
    pub success: bool,
    /// false when an existing vote was updated in place
    pub created: bool,
    pub new_rating: f64,
}

/// POST /api/votes — cast or update the caller's vote for a subject
pub async fn cast_vote(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<CastVoteRequest>,
) -> Result<Json<CastVoteResponse>, ApiError> {
    let txn = state.db.begin().await.map_err(db_error)?;

    let (kind, subject_id) = resolve_subject(&txn, body.subject_kind, body.subject_id)
        .await
        .map_err(core_error)?;
    let outcome = votes::cast_or_update_vote(&txn, kind, subject_id, &identity.login, body.score)
        .await
        .map_err(core_error)?;

    txn.commit().await.map_err(db_error)?;

    tracing::info!(
        voter = %identity.login,
        subject_kind = kind.as_str(),
        %subject_id,
        score = body.score,
        created = outcome.created,
        "vote recorded"
    );

    Ok(Json(CastVoteResponse {
        success: true,
        created: outcome.created,
        new_rating: outcome.new_rating,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VoteStatusParams {
    pub subject_kind: VoteSubject,
    pub subject_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VoteStatusResponse {
    pub has_voted: bool,
}

/// GET /api/votes/status — has the caller voted on this subject yet?
pub async fn vote_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<VoteStatusParams>,
) -> Result<Json<VoteStatusResponse>, ApiError> {
    let (kind, subject_id) = resolve_subject(&state.db, params.subject_kind, params.subject_id)
        .await
        .map_err(core_error)?;
    let has_voted = votes::has_voted(&state.db, kind, subject_id, &identity.login)
        .await
        .map_err(core_error)?;
    Ok(Json(VoteStatusResponse { has_voted }))
}
