use crate::{
    error::{AppError, AppResult},
    models::{category, Category, CategoryModel},
    utils::{slug_prefix, unique_slug},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::{HashMap, HashSet};

pub const CATEGORY_SLUG_MAX_LEN: usize = 120;

pub struct CategoryService {
    db: DatabaseConnection,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<CategoryModel>> {
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?;
        Ok(categories)
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<CategoryModel> {
        Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<CategoryModel>> {
        Ok(Category::find_by_id(id).one(&self.db).await?)
    }

    /// Batch-load categories keyed by id.
    pub async fn get_many(&self, ids: &[i32]) -> AppResult<HashMap<i32, CategoryModel>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let categories = Category::find()
            .filter(category::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await?;

        Ok(categories.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Return the category called `name`, creating it when missing.
    pub async fn ensure(&self, name: &str) -> AppResult<CategoryModel> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name must not be empty".to_string()));
        }

        if let Some(existing) = Category::find()
            .filter(category::Column::Name.eq(name))
            .one(&self.db)
            .await?
        {
            return Ok(existing);
        }

        let prefix = slug_prefix(name, "category", CATEGORY_SLUG_MAX_LEN);
        let taken: HashSet<String> = Category::find()
            .select_only()
            .column(category::Column::Slug)
            .filter(category::Column::Slug.starts_with(&prefix))
            .into_tuple::<String>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();
        let slug = unique_slug(name, "category", CATEGORY_SLUG_MAX_LEN, |s| taken.contains(s));

        let new_category = category::ActiveModel {
            name: sea_orm::ActiveValue::Set(name.to_string()),
            slug: sea_orm::ActiveValue::Set(slug),
            ..Default::default()
        };

        let created = new_category.insert(&self.db).await?;
        tracing::info!("Category created: {} ({})", created.name, created.slug);
        Ok(created)
    }
}
