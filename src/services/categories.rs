use sqlx::SqlitePool;

use crate::{
    error::{is_unique_violation, AppError},
    models::category::Category,
    repos::CategoryRepo,
};

#[derive(Clone)]
pub struct CategoryService {
    pool: SqlitePool,
}

impl CategoryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Category>, AppError> {
        Ok(CategoryRepo::list(&self.pool).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Category, AppError> {
        CategoryRepo::get_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("Category not found"))
    }

    pub async fn create(&self, name: &str) -> Result<Category, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Category name is required"));
        }
        if CategoryRepo::exists_by_name(&self.pool, name).await? {
            return Err(AppError::Conflict("Category already exists"));
        }
        let category = CategoryRepo::create(&self.pool, name).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Category already exists")
            } else {
                AppError::Sqlx(e)
            }
        })?;
        tracing::info!(category_id = category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Refuses while any movie is still linked to the category.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.get(id).await?;
        if CategoryRepo::in_use(&self.pool, id).await? {
            return Err(AppError::Conflict("Category is being used by movies"));
        }
        if !CategoryRepo::delete(&self.pool, id).await? {
            return Err(AppError::NotFound("Category not found"));
        }
        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }
}
