use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    config::ServerConfig,
    handlers::{auth, categories, movies, users},
    middleware::{require_admin, require_auth},
    AppState,
};

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable"})),
            )
        }
    }
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/movies", get(movies::list))
        .route("/movies/top-rated", get(movies::top_rated))
        .route("/movies/recently-added", get(movies::recently_added))
        .route("/movies/:id", get(movies::get))
        .route("/movies/:id/related", get(movies::related))
        .route("/categories", get(categories::list))
        .route("/categories/:id", get(categories::get))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/movies", post(movies::create))
        .route("/movies/:id", put(movies::update).delete(movies::delete))
        .route("/categories", post(categories::create))
        .route("/categories/:id", axum::routing::delete(categories::delete))
        .route("/users", get(users::list))
        .route("/users/:id", get(users::get))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Routes that need a bearer token; the admin group is nested inside so
/// authentication always runs before the admin check.
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(users::profile).put(users::update_profile))
        .route("/users/favorites", get(users::favorites))
        .route(
            "/users/favorites/:movie_id",
            post(users::add_favorite).delete(users::remove_favorite),
        )
        .nest("/admin", admin_routes(state))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(300));

    Router::new()
        .route("/health", get(health))
        .nest(
            "/api",
            public_routes().merge(protected_routes(&state)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(Duration::from_secs(
                    server.request_timeout_secs,
                )))
                .layer(DefaultBodyLimit::max(server.body_limit_bytes)),
        )
        .with_state(state)
}
