use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{movie::Movie, user::UserResponse},
    repos::{FavoriteRepo, MovieRepo, UserRepo},
};

/// Profile management, admin user listing and favorites.
#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: i64) -> Result<UserResponse, AppError> {
        UserRepo::get_by_id(&self.pool, id)
            .await?
            .map(UserResponse::from)
            .ok_or(AppError::NotFound("User not found"))
    }

    pub async fn list(&self) -> Result<Vec<UserResponse>, AppError> {
        let users = UserRepo::list(&self.pool).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn update_name(&self, id: i64, name: &str) -> Result<UserResponse, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        UserRepo::update_name(&self.pool, id, name)
            .await?
            .map(UserResponse::from)
            .ok_or(AppError::NotFound("User not found"))
    }

    pub async fn favorites(&self, user_id: i64) -> Result<Vec<Movie>, AppError> {
        Ok(FavoriteRepo::list_for_user(&self.pool, user_id).await?)
    }

    pub async fn add_favorite(&self, user_id: i64, movie_id: i64) -> Result<(), AppError> {
        if MovieRepo::get_by_id(&self.pool, movie_id).await?.is_none() {
            return Err(AppError::NotFound("Movie not found"));
        }
        FavoriteRepo::add(&self.pool, user_id, movie_id).await?;
        Ok(())
    }

    pub async fn remove_favorite(&self, user_id: i64, movie_id: i64) -> Result<(), AppError> {
        if !FavoriteRepo::remove(&self.pool, user_id, movie_id).await? {
            return Err(AppError::NotFound("Favorite not found"));
        }
        Ok(())
    }
}
