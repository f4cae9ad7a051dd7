use chrono::Utc;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::movie::{Movie, MovieFilter, MovieRow, SortOrder};

const MOVIE_COLUMNS: &str = "m.id, m.title, m.description, m.release_year, m.duration, \
     m.poster_url, m.video_url, m.categories, m.rating, m.created_at, m.updated_at";

/// Movie fields written on insert/update.
pub struct MovieFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub release_year: i32,
    pub duration: i32,
    pub poster_url: &'a str,
    pub video_url: &'a str,
    pub categories: &'a [String],
    pub rating: f64,
}

impl<'a> From<&'a Movie> for MovieFields<'a> {
    fn from(movie: &'a Movie) -> Self {
        Self {
            title: &movie.title,
            description: &movie.description,
            release_year: movie.release_year,
            duration: movie.duration,
            poster_url: &movie.poster_url,
            video_url: &movie.video_url,
            categories: &movie.categories,
            rating: movie.rating,
        }
    }
}

impl MovieFields<'_> {
    /// Title and description folded with Unicode lowercasing. SQLite's
    /// `LOWER()` only folds ASCII, so searches match against this instead.
    fn search_text(&self) -> String {
        fold_search_text(self.title, self.description)
    }
}

fn fold_search_text(title: &str, description: &str) -> String {
    format!("{}\n{}", title.to_lowercase(), description.to_lowercase())
}

/// Append the WHERE clause for every filter that is set.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MovieFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        qb.push(" AND m.search_text LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
    }

    if let Some(category_id) = filter.category_id {
        qb.push(
            " AND EXISTS (SELECT 1 FROM movie_categories mc \
             WHERE mc.movie_id = m.id AND mc.category_id = ",
        )
        .push_bind(category_id)
        .push(")");
    }

    if !filter.categories.is_empty() {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(m.categories) tag WHERE tag.value IN (");
        let mut separated = qb.separated(", ");
        for name in &filter.categories {
            separated.push_bind(name.clone());
        }
        separated.push_unseparated("))");
    }

    if let Some(year) = filter.year {
        qb.push(" AND m.release_year = ").push_bind(year);
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub struct MovieRepo;

impl MovieRepo {
    /// Count over the filtered set, ignoring paging.
    pub async fn count(pool: &SqlitePool, filter: &MovieFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM movies m");
        push_filters(&mut qb, filter);
        let (total,) = qb.build_query_as::<(i64,)>().fetch_one(pool).await?;
        Ok(total)
    }

    pub async fn search(
        pool: &SqlitePool,
        filter: &MovieFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Movie>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {MOVIE_COLUMNS} FROM movies m"));
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = qb.build_query_as::<MovieRow>().fetch_all(pool).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Movie>, sqlx::Error> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies m WHERE m.id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(Movie::from))
    }

    /// Whether `title` is used by any movie other than `exclude_id`.
    pub async fn title_taken(
        pool: &SqlitePool,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM movies WHERE title = ? AND (? IS NULL OR id != ?))",
        )
        .bind(title)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        fields: &MovieFields<'_>,
    ) -> Result<Movie, sqlx::Error> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, MovieRow>(
            "INSERT INTO movies (title, description, release_year, duration, poster_url, \
             video_url, categories, rating, search_text, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING id, title, description, release_year, duration, poster_url, video_url, \
             categories, rating, created_at, updated_at",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.release_year)
        .bind(fields.duration)
        .bind(fields.poster_url)
        .bind(fields.video_url)
        .bind(Json(fields.categories))
        .bind(fields.rating)
        .bind(fields.search_text())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.into())
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        fields: &MovieFields<'_>,
    ) -> Result<Option<Movie>, sqlx::Error> {
        let row = sqlx::query_as::<_, MovieRow>(
            "UPDATE movies SET title = ?, description = ?, release_year = ?, duration = ?, \
             poster_url = ?, video_url = ?, categories = ?, rating = ?, search_text = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING id, title, description, release_year, duration, poster_url, video_url, \
             categories, rating, created_at, updated_at",
        )
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.release_year)
        .bind(fields.duration)
        .bind(fields.poster_url)
        .bind(fields.video_url)
        .bind(Json(fields.categories))
        .bind(fields.rating)
        .bind(fields.search_text())
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Movie::from))
    }

    /// Point the movie's category associations at the categories named by
    /// its tags. Tags with no matching category are left unlinked.
    pub async fn sync_category_links(
        conn: &mut SqliteConnection,
        movie_id: i64,
        tags: &[String],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM movie_categories WHERE movie_id = ?")
            .bind(movie_id)
            .execute(&mut *conn)
            .await?;
        if tags.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO movie_categories (movie_id, category_id, created_at) SELECT ",
        );
        qb.push_bind(movie_id)
            .push(", c.id, ")
            .push_bind(Utc::now())
            .push(" FROM categories c WHERE c.name IN (");
        {
            let mut separated = qb.separated(", ");
            for tag in tags {
                separated.push_bind(tag.clone());
            }
            separated.push_unseparated(")");
        }
        qb.build().execute(&mut *conn).await?;
        Ok(())
    }

    pub async fn delete_category_links(
        conn: &mut SqliteConnection,
        movie_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM movie_categories WHERE movie_id = ?")
            .bind(movie_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Returns false when no row was removed.
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn top_rated(pool: &SqlitePool, limit: i64) -> Result<Vec<Movie>, sqlx::Error> {
        Self::ordered(pool, SortOrder::RatingDesc, limit).await
    }

    pub async fn recently_added(pool: &SqlitePool, limit: i64) -> Result<Vec<Movie>, sqlx::Error> {
        Self::ordered(pool, SortOrder::Newest, limit).await
    }

    async fn ordered(
        pool: &SqlitePool,
        sort: SortOrder,
        limit: i64,
    ) -> Result<Vec<Movie>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies m ORDER BY {} LIMIT ?",
            sort.order_by()
        ))
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    /// Other movies sharing at least one tag with `movie`, best rated first.
    pub async fn related(
        pool: &SqlitePool,
        movie: &Movie,
        limit: i64,
    ) -> Result<Vec<Movie>, sqlx::Error> {
        if movie.categories.is_empty() {
            return Ok(Vec::new());
        }
        let filter = MovieFilter {
            categories: movie.categories.clone(),
            ..MovieFilter::default()
        };
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {MOVIE_COLUMNS} FROM movies m"));
        push_filters(&mut qb, &filter);
        qb.push(" AND m.id != ")
            .push_bind(movie.id)
            .push(" ORDER BY ")
            .push(SortOrder::RatingDesc.order_by())
            .push(" LIMIT ")
            .push_bind(limit);
        let rows = qb.build_query_as::<MovieRow>().fetch_all(pool).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }
}
