use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::error::AppError;

/// Row shape of the `movies` table; tags are stored as a JSON array.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub release_year: i32,
    pub duration: i32,
    pub poster_url: String,
    pub video_url: String,
    pub categories: Json<Vec<String>>,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub release_year: i32,
    /// Minutes
    pub duration: i32,
    pub poster_url: String,
    pub video_url: String,
    pub categories: Vec<String>,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            release_year: row.release_year,
            duration: row.duration,
            poster_url: row.poster_url,
            video_url: row.video_url,
            categories: row.categories.0,
            rating: row.rating,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovie {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub release_year: i32,
    #[serde(default)]
    pub duration: i32,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub rating: f64,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMovie {
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_year: Option<i32>,
    pub duration: Option<i32>,
    pub poster_url: Option<String>,
    pub video_url: Option<String>,
    pub categories: Option<Vec<String>>,
    pub rating: Option<f64>,
}

impl CreateMovie {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        validate_numbers(self.release_year, self.duration, self.rating)
    }
}

impl UpdateMovie {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_numbers(
            self.release_year.unwrap_or(1900),
            self.duration.unwrap_or(0),
            self.rating.unwrap_or(0.0),
        )
    }

    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            movie.description = description;
        }
        if let Some(release_year) = self.release_year {
            movie.release_year = release_year;
        }
        if let Some(duration) = self.duration {
            movie.duration = duration;
        }
        if let Some(poster_url) = self.poster_url {
            movie.poster_url = poster_url;
        }
        if let Some(video_url) = self.video_url {
            movie.video_url = video_url;
        }
        if let Some(categories) = self.categories {
            movie.categories = normalize_tags(categories);
        }
        if let Some(rating) = self.rating {
            movie.rating = rating;
        }
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    Ok(())
}

fn validate_numbers(release_year: i32, duration: i32, rating: f64) -> Result<(), AppError> {
    if !(1800..=3000).contains(&release_year) {
        return Err(AppError::validation("Release year is out of range"));
    }
    if duration < 0 {
        return Err(AppError::validation("Duration must not be negative"));
    }
    if !(0.0..=10.0).contains(&rating) {
        return Err(AppError::validation("Rating must be between 0 and 10"));
    }
    Ok(())
}

/// Trim, drop empties and de-duplicate while keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    TitleAsc,
    TitleDesc,
    YearAsc,
    YearDesc,
    RatingDesc,
    #[default]
    Newest,
}

impl SortOrder {
    /// Exact, case-sensitive keys; anything unrecognised sorts newest first.
    pub fn from_key(key: &str) -> Self {
        match key {
            "title_asc" => SortOrder::TitleAsc,
            "title_desc" => SortOrder::TitleDesc,
            "year_asc" => SortOrder::YearAsc,
            "year_desc" => SortOrder::YearDesc,
            "rating_desc" => SortOrder::RatingDesc,
            _ => SortOrder::Newest,
        }
    }

    pub(crate) fn order_by(self) -> &'static str {
        match self {
            SortOrder::TitleAsc => "m.title ASC, m.id DESC",
            SortOrder::TitleDesc => "m.title DESC, m.id DESC",
            SortOrder::YearAsc => "m.release_year ASC, m.id DESC",
            SortOrder::YearDesc => "m.release_year DESC, m.id DESC",
            SortOrder::RatingDesc => "m.rating DESC, m.id DESC",
            SortOrder::Newest => "m.created_at DESC, m.id DESC",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub categories: Vec<String>,
    pub year: Option<i32>,
    pub sort: SortOrder,
    pub page: i64,
    pub page_size: i64,
}

impl MovieFilter {
    /// Build a filter from raw query pairs. `categories` may be repeated or
    /// comma separated.
    pub fn from_query_pairs(pairs: &[(String, String)]) -> Result<Self, AppError> {
        let mut filter = MovieFilter::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                "search" if !value.is_empty() => filter.search = Some(value.to_string()),
                "sort_by" => filter.sort = SortOrder::from_key(value),
                "categories" | "categories[]" => filter.categories.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                ),
                "category_id" if !value.is_empty() => {
                    filter.category_id = Some(parse_number(value, "category_id")?)
                }
                "year" if !value.is_empty() => filter.year = Some(parse_number(value, "year")?),
                "page" if !value.is_empty() => filter.page = parse_number(value, "page")?,
                "page_size" if !value.is_empty() => {
                    filter.page_size = parse_number(value, "page_size")?
                }
                _ => {}
            }
        }
        Ok(filter)
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid {}", field)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}
