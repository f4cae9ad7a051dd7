use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::user::User;

const USER_COLUMNS: &str = "id, email, password_hash, name, is_admin, created_at, updated_at";

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub is_admin: bool,
}

/// Credential store over the `users` table.
pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &SqlitePool, user: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, name, is_admin, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.name)
        .bind(user.is_admin)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists_by_email(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(pool)
            .await
    }

    pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn update_name(
        pool: &SqlitePool,
        id: i64,
        name: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = ?, updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Returns false when no such user exists.
    pub async fn set_admin(pool: &SqlitePool, id: i64, is_admin: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET is_admin = ?, updated_at = ? WHERE id = ?")
            .bind(is_admin)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
