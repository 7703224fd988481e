pub mod albums;
pub mod artists;
pub mod biographies;
pub mod categories;
pub mod search;
pub mod songs;
pub mod votes;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use harmonia_core::CoreError;

/// Error shape shared by every handler: a status code plus a JSON body the
/// frontend can surface ({"error": ...}, optionally {"field": ...}).
pub(crate) type ApiError = (StatusCode, Json<Value>);

pub(crate) fn db_error(err: sea_orm::DbErr) -> ApiError {
    tracing::error!("database error: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("DB error: {err}") })),
    )
}

pub(crate) fn core_error(err: CoreError) -> ApiError {
    if let CoreError::Database(ref db) = err {
        tracing::error!("database error: {db}");
    }
    let status = match &err {
        CoreError::InvalidScore(_) | CoreError::Uniqueness { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CoreError::NotFound(..) => StatusCode::NOT_FOUND,
        CoreError::Conflict => StatusCode::CONFLICT,
        CoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = match &err {
        CoreError::Uniqueness { field, message } => json!({ "field": field, "error": message }),
        other => json!({ "error": other.to_string() }),
    };
    (status, Json(body))
}

pub(crate) fn not_found(entity: &'static str, id: uuid::Uuid) -> ApiError {
    core_error(CoreError::NotFound(entity, id))
}

/// Field-level validation failure (duplicate name, still-referenced record…)
pub(crate) fn validation_error(field: &'static str, message: impl Into<String>) -> ApiError {
    core_error(CoreError::Uniqueness {
        field,
        message: message.into(),
    })
}
