use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::models::movie::{Movie, MovieRow};

pub struct FavoriteRepo;

impl FavoriteRepo {
    /// Idempotent: favoriting twice keeps a single row.
    pub async fn add(pool: &SqlitePool, user_id: i64, movie_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_favorites (user_id, movie_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id, movie_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove(pool: &SqlitePool, user_id: i64, movie_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_favorites WHERE user_id = ? AND movie_id = ?")
            .bind(user_id)
            .bind(movie_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Movie>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MovieRow>(
            "SELECT m.id, m.title, m.description, m.release_year, m.duration, m.poster_url, \
             m.video_url, m.categories, m.rating, m.created_at, m.updated_at \
             FROM user_favorites f JOIN movies m ON m.id = f.movie_id \
             WHERE f.user_id = ? ORDER BY f.created_at DESC, f.id DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn delete_for_movie(
        conn: &mut SqliteConnection,
        movie_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_favorites WHERE movie_id = ?")
            .bind(movie_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
