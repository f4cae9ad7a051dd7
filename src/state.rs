use chrono::Duration;
use sqlx::SqlitePool;

use crate::{
    config::AppConfig,
    services::{AuthService, CategoryService, MovieService, UserService},
    token::TokenCodec,
};

/// Shared handles for every request. Cloning is cheap: the pool and the
/// services are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub auth: AuthService,
    pub movies: MovieService,
    pub categories: CategoryService,
    pub users: UserService,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &AppConfig) -> Result<Self, argon2::Error> {
        let codec = TokenCodec::new(
            &config.auth.jwt_secret,
            Duration::hours(config.auth.token_ttl_hours),
        );
        let auth = AuthService::new(db.clone(), codec, &config.auth.password_hashing)?;
        Ok(Self {
            auth,
            movies: MovieService::new(db.clone(), config.catalog.max_page_size),
            categories: CategoryService::new(db.clone()),
            users: UserService::new(db.clone()),
            db,
        })
    }
}
