use sqlx::SqlitePool;

use crate::{
    error::{is_unique_violation, AppError},
    models::movie::{normalize_tags, CreateMovie, Movie, MovieFilter, MoviePage, UpdateMovie},
    repos::{movies::MovieFields, FavoriteRepo, MovieRepo},
};

/// Page size used whenever the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Effective paging after defaults and clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub page_size: i64,
}

impl Paging {
    pub fn resolve(page: i64, page_size: i64, max_page_size: i64) -> Self {
        let page = if page <= 0 { 1 } else { page };
        let page_size = if page_size <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(max_page_size)
        };
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Catalog queries and admin mutations over movies.
#[derive(Clone)]
pub struct MovieService {
    pool: SqlitePool,
    max_page_size: i64,
}

impl MovieService {
    pub fn new(pool: SqlitePool, max_page_size: i64) -> Self {
        Self {
            pool,
            max_page_size,
        }
    }

    /// Filtered, sorted page plus the total size of the filtered set.
    pub async fn query(&self, filter: &MovieFilter) -> Result<MoviePage, AppError> {
        let paging = Paging::resolve(filter.page, filter.page_size, self.max_page_size);
        let total = MovieRepo::count(&self.pool, filter).await?;
        let movies =
            MovieRepo::search(&self.pool, filter, paging.page_size, paging.offset()).await?;
        let total_pages = (total + paging.page_size - 1) / paging.page_size;

        Ok(MoviePage {
            movies,
            total,
            page: paging.page,
            page_size: paging.page_size,
            total_pages,
        })
    }

    pub async fn get(&self, id: i64) -> Result<Movie, AppError> {
        MovieRepo::get_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Movie not found"))
    }

    pub async fn create(&self, input: CreateMovie) -> Result<Movie, AppError> {
        input.validate()?;
        let title = input.title.trim().to_string();
        if MovieRepo::title_taken(&self.pool, &title, None).await? {
            return Err(AppError::Conflict("Movie title already exists"));
        }
        let categories = normalize_tags(input.categories);

        let mut tx = self.pool.begin().await?;
        let movie = MovieRepo::insert(
            &mut tx,
            &MovieFields {
                title: &title,
                description: &input.description,
                release_year: input.release_year,
                duration: input.duration,
                poster_url: &input.poster_url,
                video_url: &input.video_url,
                categories: &categories,
                rating: input.rating,
            },
        )
        .await
        .map_err(title_conflict)?;
        MovieRepo::sync_category_links(&mut tx, movie.id, &movie.categories).await?;
        tx.commit().await?;

        tracing::info!(movie_id = movie.id, title = %movie.title, "movie created");
        Ok(movie)
    }

    pub async fn update(&self, id: i64, input: UpdateMovie) -> Result<Movie, AppError> {
        input.validate()?;
        let mut movie = self.get(id).await?;
        let tags_changed = input.categories.is_some();
        input.apply(&mut movie);

        if MovieRepo::title_taken(&self.pool, &movie.title, Some(id)).await? {
            return Err(AppError::Conflict("Movie title already taken"));
        }

        let mut tx = self.pool.begin().await?;
        let updated = MovieRepo::update(&mut tx, id, &MovieFields::from(&movie))
            .await
            .map_err(title_conflict)?
            .ok_or(AppError::NotFound("Movie not found"))?;
        if tags_changed {
            MovieRepo::sync_category_links(&mut tx, id, &updated.categories).await?;
        }
        tx.commit().await?;

        tracing::info!(movie_id = id, "movie updated");
        Ok(updated)
    }

    /// Remove the movie with its category links and favorites in one
    /// transaction; nothing is removed if any step fails.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let links = MovieRepo::delete_category_links(&mut tx, id).await?;
        let favorites = FavoriteRepo::delete_for_movie(&mut tx, id).await?;
        if !MovieRepo::delete(&mut tx, id).await? {
            return Err(AppError::NotFound("Movie not found"));
        }
        tx.commit().await?;

        tracing::info!(movie_id = id, links, favorites, "movie deleted");
        Ok(())
    }

    pub async fn top_rated(&self, limit: Option<i64>) -> Result<Vec<Movie>, AppError> {
        Ok(MovieRepo::top_rated(&self.pool, self.limit(limit)).await?)
    }

    pub async fn recently_added(&self, limit: Option<i64>) -> Result<Vec<Movie>, AppError> {
        Ok(MovieRepo::recently_added(&self.pool, self.limit(limit)).await?)
    }

    pub async fn related(&self, id: i64, limit: Option<i64>) -> Result<Vec<Movie>, AppError> {
        let movie = self.get(id).await?;
        Ok(MovieRepo::related(&self.pool, &movie, self.limit(limit)).await?)
    }

    fn limit(&self, limit: Option<i64>) -> i64 {
        match limit {
            Some(l) if l > 0 => l.min(self.max_page_size),
            _ => DEFAULT_LIST_LIMIT,
        }
    }
}

fn title_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("Movie title already exists")
    } else {
        AppError::Sqlx(e)
    }
}
