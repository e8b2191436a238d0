use crate::{
    error::{AppError, AppResult},
    models::{comment, post, user, Comment, Post, PostModel, PostStatus, User, UserModel},
    response::resolve_page,
    utils::{is_reserved, slug_prefix, unique_slug},
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, SqlErr, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

pub const POSTS_PER_PAGE: u64 = 12;
pub const RELATED_POSTS_LIMIT: u64 = 4;
pub const POST_SLUG_MAX_LEN: usize = 220;
/// Inserts attempted before a lost slug race is reported.
const SLUG_ATTEMPTS: usize = 5;

/// Validated content of the post form.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub body: String,
    pub category_id: Option<i32>,
    pub status: PostStatus,
    pub is_featured: bool,
    /// Newly uploaded thumbnail URL; `None` keeps whatever the post has.
    pub thumbnail: Option<String>,
}

/// Which published posts a listing shows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingFilter {
    pub exclude_id: Option<i32>,
    pub category_id: Option<i32>,
}

/// One page of a listing, with the page number actually served.
#[derive(Debug)]
pub struct PostPage {
    pub posts: Vec<PostModel>,
    pub total: u64,
    pub page: u64,
}

pub struct PostService {
    db: DatabaseConnection,
    reserved: Vec<String>,
}

fn published() -> Select<Post> {
    Post::find()
        .filter(post::Column::Status.eq(PostStatus::Published))
        .order_by_desc(post::Column::CreatedAt)
        .order_by_desc(post::Column::Id)
}

impl PostService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            reserved: Vec::new(),
        }
    }

    /// Keep new slugs off `segment` as well, e.g. the media URL prefix.
    pub fn reserving(mut self, segment: &str) -> Self {
        if !segment.is_empty() {
            self.reserved.push(segment.to_string());
        }
        self
    }

    /// The home page hero: newest published post flagged as featured.
    pub async fn featured(&self) -> AppResult<Option<PostModel>> {
        let post = published()
            .filter(post::Column::IsFeatured.eq(true))
            .one(&self.db)
            .await?;
        Ok(post)
    }

    pub async fn list_published(
        &self,
        filter: ListingFilter,
        raw_page: Option<&str>,
        per_page: u64,
    ) -> AppResult<PostPage> {
        let mut query = published();
        if let Some(id) = filter.exclude_id {
            query = query.filter(post::Column::Id.ne(id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(post::Column::CategoryId.eq(category_id));
        }

        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let page = resolve_page(raw_page, total, per_page);
        let posts = paginator.fetch_page(page - 1).await?;

        Ok(PostPage { posts, total, page })
    }

    pub async fn get_by_slug(&self, slug: &str) -> AppResult<PostModel> {
        Post::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_published_by_slug(&self, slug: &str) -> AppResult<PostModel> {
        Post::find()
            .filter(post::Column::Slug.eq(slug))
            .filter(post::Column::Status.eq(PostStatus::Published))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// `views = views + 1` in a single statement, so concurrent hits never
    /// lose an increment.
    pub async fn increment_views(&self, id: i32) -> AppResult<()> {
        Post::update_many()
            .col_expr(post::Column::Views, Expr::col(post::Column::Views).add(1))
            .filter(post::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Published posts sharing the category of `current`. Posts without a
    /// category relate to each other.
    pub async fn related(&self, current: &PostModel, limit: u64) -> AppResult<Vec<PostModel>> {
        let same_category = match current.category_id {
            Some(id) => post::Column::CategoryId.eq(id),
            None => post::Column::CategoryId.is_null(),
        };

        let posts = published()
            .filter(same_category)
            .filter(post::Column::Id.ne(current.id))
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(posts)
    }

    /// Insert a post under a free slug. A concurrent create that takes the
    /// same slug first makes the insert fail on the unique index; the slug
    /// is then recomputed and the insert retried.
    pub async fn create(&self, author_id: i32, input: PostInput) -> AppResult<PostModel> {
        let now = chrono::Utc::now().naive_utc();
        let mut attempt = 1;

        loop {
            let slug = self.free_slug(&input.title).await?;
            let new_post = post::ActiveModel {
                title: sea_orm::ActiveValue::Set(input.title.clone()),
                slug: sea_orm::ActiveValue::Set(slug),
                body: sea_orm::ActiveValue::Set(input.body.clone()),
                author_id: sea_orm::ActiveValue::Set(author_id),
                category_id: sea_orm::ActiveValue::Set(input.category_id),
                status: sea_orm::ActiveValue::Set(input.status),
                is_featured: sea_orm::ActiveValue::Set(input.is_featured),
                thumbnail: sea_orm::ActiveValue::Set(input.thumbnail.clone()),
                views: sea_orm::ActiveValue::Set(0),
                created_at: sea_orm::ActiveValue::Set(now),
                updated_at: sea_orm::ActiveValue::Set(now),
                ..Default::default()
            };

            match new_post.insert(&self.db).await {
                Ok(post) => {
                    tracing::info!("Post created: {} (id {}, author {})", post.slug, post.id, author_id);
                    return Ok(post);
                }
                Err(e) if attempt < SLUG_ATTEMPTS
                    && matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    tracing::debug!("Slug taken concurrently for {:?}, retrying", input.title);
                    attempt += 1;
                }
                Err(e) => return Err(AppError::Database(e)),
            }
        }
    }

    /// Apply the edit form. The slug is fixed at creation and never follows
    /// title changes.
    pub async fn update(&self, existing: PostModel, input: PostInput) -> AppResult<PostModel> {
        let now = chrono::Utc::now().naive_utc();

        let mut active: post::ActiveModel = existing.into();
        active.title = sea_orm::ActiveValue::Set(input.title);
        active.body = sea_orm::ActiveValue::Set(input.body);
        active.category_id = sea_orm::ActiveValue::Set(input.category_id);
        active.status = sea_orm::ActiveValue::Set(input.status);
        active.is_featured = sea_orm::ActiveValue::Set(input.is_featured);
        if let Some(url) = input.thumbnail {
            active.thumbnail = sea_orm::ActiveValue::Set(Some(url));
        }
        active.updated_at = sea_orm::ActiveValue::Set(now);

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Remove a post together with its comments.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let txn = self.db.begin().await?;

        Comment::delete_many()
            .filter(comment::Column::PostId.eq(id))
            .exec(&txn)
            .await?;
        let result = Post::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::NotFound);
        }

        txn.commit().await?;
        tracing::info!("Post deleted: id {}", id);
        Ok(())
    }

    /// Batch-load the authors of `posts`, keyed by user id.
    pub async fn authors_of(&self, posts: &[PostModel]) -> AppResult<HashMap<i32, UserModel>> {
        let ids: HashSet<i32> = posts.iter().map(|p| p.author_id).collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = User::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn free_slug(&self, title: &str) -> AppResult<String> {
        let prefix = slug_prefix(title, "post", POST_SLUG_MAX_LEN);
        let taken: HashSet<String> = Post::find()
            .select_only()
            .column(post::Column::Slug)
            .filter(post::Column::Slug.starts_with(&prefix))
            .into_tuple::<String>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(unique_slug(title, "post", POST_SLUG_MAX_LEN, |s| {
            taken.contains(s) || is_reserved(s, &self.reserved)
        }))
    }
}
