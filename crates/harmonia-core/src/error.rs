//! Core error types.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("score {0} is out of range, votes take 1 through 5")]
    InvalidScore(i16),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, Uuid),

    #[error("write conflict, retry the operation")]
    Conflict,

    #[error("{field}: {message}")]
    Uniqueness {
        field: &'static str,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl CoreError {
    /// An update that matched no row means the row was deleted under us
    /// between the read and the write.
    pub fn from_update(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::RecordNotUpdated => CoreError::Conflict,
            other => CoreError::Database(other),
        }
    }
}
