use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    handlers::{body, id_param},
    models::category::{Category, CreateCategory},
    AppState,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.categories.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Category>, AppError> {
    let id = id_param(path, "category")?;
    Ok(Json(state.categories.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategory>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let payload = body(payload)?;
    let category = state.categories.create(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = id_param(path, "category")?;
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
