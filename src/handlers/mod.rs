pub mod auth;
pub mod categories;
pub mod movies;
pub mod users;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query},
    Json,
};
use serde::Deserialize;

use crate::error::AppError;

/// Unwrap an extractor result so rejections share the `{"error": ..}` shape.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|e| AppError::validation(format!("Invalid request body: {}", e.body_text())))
}

pub(crate) fn id_param(path: Result<Path<i64>, PathRejection>, what: &str) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::validation(format!("Invalid {} ID", what)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub(crate) fn limit(query: Result<Query<LimitQuery>, QueryRejection>) -> Result<Option<i64>, AppError> {
    query
        .map(|Query(q)| q.limit)
        .map_err(|_| AppError::validation("Invalid limit"))
}
