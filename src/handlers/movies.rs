use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::AppError,
    handlers::{body, id_param, limit, LimitQuery},
    models::movie::{CreateMovie, Movie, MovieFilter, MoviePage, UpdateMovie},
    AppState,
};

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<MoviePage>, AppError> {
    let Query(pairs) = query.map_err(|_| AppError::validation("Invalid query string"))?;
    let filter = MovieFilter::from_query_pairs(&pairs)?;
    Ok(Json(state.movies.query(&filter).await?))
}

pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Movie>, AppError> {
    let id = id_param(path, "movie")?;
    Ok(Json(state.movies.get(id).await?))
}

pub async fn top_rated(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, AppError> {
    Ok(Json(state.movies.top_rated(limit(query)?).await?))
}

pub async fn recently_added(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, AppError> {
    Ok(Json(state.movies.recently_added(limit(query)?).await?))
}

pub async fn related(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Vec<Movie>>, AppError> {
    let id = id_param(path, "movie")?;
    Ok(Json(state.movies.related(id, limit(query)?).await?))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateMovie>, JsonRejection>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    let movie = state.movies.create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn update(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateMovie>, JsonRejection>,
) -> Result<Json<Movie>, AppError> {
    let id = id_param(path, "movie")?;
    Ok(Json(state.movies.update(id, body(payload)?).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = id_param(path, "movie")?;
    state.movies.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
