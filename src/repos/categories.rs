use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::category::Category;

pub struct CategoryRepo;

impl CategoryRepo {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at, updated_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists_by_name(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?)")
            .bind(name)
            .fetch_one(pool)
            .await
    }

    pub async fn create(pool: &SqlitePool, name: &str) -> Result<Category, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, created_at, updated_at) VALUES (?, ?, ?) \
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Whether any movie is linked to the category.
    pub async fn in_use(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM movie_categories WHERE category_id = ?)",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
