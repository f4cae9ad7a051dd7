use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};

use crate::{
    error::AppError,
    handlers::{body, id_param},
    middleware::CurrentUser,
    models::{
        movie::Movie,
        user::{UpdateProfilePayload, UserResponse},
    },
    AppState,
};

pub async fn profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.users.get(current.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    payload: Result<Json<UpdateProfilePayload>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let payload = body(payload)?;
    Ok(Json(
        state.users.update_name(current.user_id, &payload.name).await?,
    ))
}

pub async fn favorites(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<Movie>>, AppError> {
    Ok(Json(state.users.favorites(current.user_id).await?))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let movie_id = id_param(path, "movie")?;
    state.users.add_favorite(current.user_id, movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let movie_id = id_param(path, "movie")?;
    state.users.remove_favorite(current.user_id, movie_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(state.users.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let id = id_param(path, "user")?;
    Ok(Json(state.users.get(id).await?))
}
