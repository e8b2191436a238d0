use crate::config::media::MediaConfig;
use crate::error::{AppResult, ErrorResponse};
use crate::handlers::comment::{CommentForm, CommentResponse};
use crate::middleware::{AuthUser, Messages};
use crate::models::{CategoryModel, PostModel, PostStatus, UserModel};
use crate::response::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::services::category::CategoryService;
use crate::services::comment::CommentService;
use crate::services::post::{
    ListingFilter, PostInput, PostService, POSTS_PER_PAGE, RELATED_POSTS_LIMIT,
};
use crate::services::upload::{CheckedImage, UploadService, THUMBNAILS_DIR};
use crate::utils::form::{BoundForm, FormData, FormErrors};
use crate::utils::{excerpt, render_markdown};
use axum::{
    extract::{Path, Query},
    response::Response,
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

const EXCERPT_CHARS: usize = 200;
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

pub fn detail_url(slug: &str) -> String {
    format!("/{slug}/")
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<CategoryModel> for CategorySummary {
    fn from(c: CategoryModel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorSummary {
    pub id: i32,
    pub username: String,
    pub avatar: Option<String>,
}

impl From<UserModel> for AuthorSummary {
    fn from(u: UserModel) -> Self {
        Self {
            id: u.id,
            username: u.username,
            avatar: u.avatar,
        }
    }
}

/// A post as shown in listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostCard {
    pub id: i32,
    pub title: String,
    pub slug: String,
    /// Plain-text teaser of the body
    pub excerpt: String,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub is_featured: bool,
    pub views: i32,
    pub author: Option<AuthorSummary>,
    pub category: Option<CategorySummary>,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetail {
    pub id: i32,
    pub title: String,
    pub slug: String,
    /// Markdown source
    pub body: String,
    /// Rendered and sanitized HTML
    pub body_html: String,
    pub thumbnail: Option<String>,
    pub status: PostStatus,
    pub is_featured: bool,
    pub views: i32,
    pub author: Option<AuthorSummary>,
    pub category: Option<CategorySummary>,
    pub created_at: String,
    pub updated_at: String,
    /// Whether the viewer may edit or delete this post
    pub can_edit: bool,
}

/// Just enough of a post to link to it.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostRef {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub thumbnail: Option<String>,
}

impl From<&PostModel> for PostRef {
    fn from(p: &PostModel) -> Self {
        Self {
            id: p.id,
            title: p.title.clone(),
            slug: p.slug.clone(),
            thumbnail: p.thumbnail.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HomePage {
    /// Hero post, if any published post is featured
    pub featured: Option<PostCard>,
    pub posts: PaginatedResponse<PostCard>,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryPage {
    pub category: CategorySummary,
    pub posts: PaginatedResponse<PostCard>,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DetailPage {
    pub post: PostDetail,
    pub comments: Vec<CommentResponse>,
    pub comment_form: BoundForm<CommentForm>,
    pub related: Vec<PostCard>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostFormPage {
    pub form: BoundForm<PostForm>,
    pub categories: Vec<CategorySummary>,
    /// The post being edited; absent when creating
    pub post: Option<PostRef>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletePage {
    pub post: PostRef,
}

/// Text fields of the post form; `thumbnail` arrives as a multipart file.
#[derive(Debug, Default, Serialize, Validate, ToSchema)]
pub struct PostForm {
    #[validate(length(max = 200, message = "Ensure this value has at most 200 characters."))]
    pub title: String,
    /// Markdown
    pub body: String,
    /// Category id, empty for none
    pub category: String,
    /// `draft` or `published`
    pub status: String,
    pub is_featured: bool,
}

/// The post form after validation, minus the uploaded file.
#[derive(Debug)]
struct CleanPost {
    title: String,
    body: String,
    category_id: Option<i32>,
    status: PostStatus,
    is_featured: bool,
}

impl CleanPost {
    fn into_input(self, thumbnail: Option<String>) -> PostInput {
        PostInput {
            title: self.title,
            body: self.body,
            category_id: self.category_id,
            status: self.status,
            is_featured: self.is_featured,
            thumbnail,
        }
    }
}

impl PostForm {
    fn from_form(form: &FormData) -> Self {
        Self {
            title: form.text("title").trim().to_string(),
            body: form.text("body").to_string(),
            category: form.text("category").trim().to_string(),
            status: form
                .opt_text("status")
                .unwrap_or(PostStatus::Draft.as_str())
                .to_string(),
            is_featured: form.checkbox("is_featured"),
        }
    }

    fn from_post(post: &PostModel) -> Self {
        Self {
            title: post.title.clone(),
            body: post.body.clone(),
            category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            status: post.status.as_str().to_string(),
            is_featured: post.is_featured,
        }
    }

    /// Field-level rules. Whether the chosen category exists is checked
    /// against the database separately.
    fn clean(&self) -> Result<CleanPost, FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        if self.title.is_empty() {
            errors.add("title", "This field is required.");
        }
        if self.body.trim().is_empty() {
            errors.add("body", "This field is required.");
        }

        let category_id = if self.category.is_empty() {
            None
        } else {
            match self.category.parse::<i32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("category", INVALID_CHOICE);
                    None
                }
            }
        };

        let status = PostStatus::parse(&self.status).unwrap_or_else(|| {
            errors.add(
                "status",
                format!("Select a valid choice. {} is not one of the available choices.", self.status),
            );
            PostStatus::Draft
        });

        errors.into_result(CleanPost {
            title: self.title.clone(),
            body: self.body.clone(),
            category_id,
            status,
            is_featured: self.is_featured,
        })
    }
}

/// Validate a submitted post form, including the category lookup and the
/// optional thumbnail.
async fn clean_post_submission(
    db: &DatabaseConnection,
    data: &PostForm,
    form: &mut FormData,
) -> AppResult<Result<(CleanPost, Option<CheckedImage>), FormErrors>> {
    let mut errors = FormErrors::new();
    let cleaned = match data.clean() {
        Ok(cleaned) => Some(cleaned),
        Err(e) => {
            errors.merge(e);
            None
        }
    };

    if let Some(category_id) = cleaned.as_ref().and_then(|c| c.category_id) {
        if CategoryService::new(db.clone())
            .find_by_id(category_id)
            .await?
            .is_none()
        {
            errors.add("category", INVALID_CHOICE);
        }
    }

    let thumbnail = UploadService::take_image(form, "thumbnail", &mut errors);

    Ok(match cleaned {
        Some(cleaned) if errors.is_empty() => Ok((cleaned, thumbnail)),
        _ => Err(errors),
    })
}

async fn store_thumbnail(media: MediaConfig, image: Option<CheckedImage>) -> AppResult<Option<String>> {
    match image {
        Some(image) => Ok(Some(
            UploadService::new(media)
                .save_image(image, THUMBNAILS_DIR)
                .await?,
        )),
        None => Ok(None),
    }
}

async fn category_summaries(db: &DatabaseConnection) -> AppResult<Vec<CategorySummary>> {
    let categories = CategoryService::new(db.clone()).list().await?;
    Ok(categories.into_iter().map(CategorySummary::from).collect())
}

/// Attach authors and categories to a page of posts (two batch queries).
async fn build_cards(db: &DatabaseConnection, posts: Vec<PostModel>) -> AppResult<Vec<PostCard>> {
    let authors = PostService::new(db.clone()).authors_of(&posts).await?;
    let category_ids: Vec<i32> = posts.iter().filter_map(|p| p.category_id).collect();
    let categories = CategoryService::new(db.clone())
        .get_many(&category_ids)
        .await?;

    let cards = posts
        .into_iter()
        .map(|p| {
            let author = authors.get(&p.author_id).cloned().map(AuthorSummary::from);
            let category = p
                .category_id
                .and_then(|id| categories.get(&id).cloned())
                .map(CategorySummary::from);
            PostCard {
                id: p.id,
                excerpt: excerpt(&p.body, EXCERPT_CHARS),
                title: p.title,
                slug: p.slug,
                thumbnail: p.thumbnail,
                status: p.status,
                is_featured: p.is_featured,
                views: p.views,
                author,
                category,
                created_at: p.created_at.to_string(),
            }
        })
        .collect();

    Ok(cards)
}

/// Everything the detail page shows for `post`, with `comment_form` as the
/// comment box.
pub(crate) async fn detail_page(
    db: &DatabaseConnection,
    post: PostModel,
    viewer: Option<&AuthUser>,
    comment_form: BoundForm<CommentForm>,
) -> AppResult<DetailPage> {
    let related = PostService::new(db.clone())
        .related(&post, RELATED_POSTS_LIMIT)
        .await?;
    let related = build_cards(db, related).await?;

    let comments = CommentService::new(db.clone())
        .list_active(post.id)
        .await?
        .into_iter()
        .map(|(comment, author)| CommentResponse::new(comment, author))
        .collect();

    let can_edit = viewer.is_some_and(|u| u.can_modify(post.author_id));
    let body_html = render_markdown(&post.body);
    let mut card = build_cards(db, vec![post.clone()]).await?;
    let (author, category) = match card.pop() {
        Some(card) => (card.author, card.category),
        None => (None, None),
    };

    Ok(DetailPage {
        post: PostDetail {
            id: post.id,
            title: post.title,
            slug: post.slug,
            body: post.body,
            body_html,
            thumbnail: post.thumbnail,
            status: post.status,
            is_featured: post.is_featured,
            views: post.views,
            author,
            category,
            created_at: post.created_at.to_string(),
            updated_at: post.updated_at.to_string(),
            can_edit,
        },
        comments,
        comment_form,
        related,
    })
}

#[utoipa::path(
    get,
    path = "/",
    params(("page" = Option<String>, Query, description = "Page number")),
    responses(
        (status = 200, description = "Featured post, paginated grid of the rest and all categories", body = ApiResponse<HomePage>),
    ),
    tag = "blog"
)]
pub async fn home(
    Extension(db): Extension<DatabaseConnection>,
    Query(params): Query<PaginationQuery>,
    messages: Messages,
) -> AppResult<Response> {
    let service = PostService::new(db.clone());
    let featured = service.featured().await?;

    let filter = ListingFilter {
        exclude_id: featured.as_ref().map(|p| p.id),
        category_id: None,
    };
    let page = service
        .list_published(filter, params.page.as_deref(), POSTS_PER_PAGE)
        .await?;

    let featured = match featured {
        Some(post) => build_cards(&db, vec![post]).await?.pop(),
        None => None,
    };
    let items = build_cards(&db, page.posts).await?;

    messages.render(HomePage {
        featured,
        posts: PaginatedResponse::new(items, page.total, page.page, POSTS_PER_PAGE),
        categories: category_summaries(&db).await?,
    })
}

#[utoipa::path(
    get,
    path = "/category/{slug}/",
    params(
        ("slug" = String, Path, description = "Category slug"),
        ("page" = Option<String>, Query, description = "Page number"),
    ),
    responses(
        (status = 200, description = "Published posts in the category", body = ApiResponse<CategoryPage>),
        (status = 404, description = "Unknown category", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn category_posts(
    Extension(db): Extension<DatabaseConnection>,
    Path(slug): Path<String>,
    Query(params): Query<PaginationQuery>,
    messages: Messages,
) -> AppResult<Response> {
    let category = CategoryService::new(db.clone()).get_by_slug(&slug).await?;

    let filter = ListingFilter {
        exclude_id: None,
        category_id: Some(category.id),
    };
    let page = PostService::new(db.clone())
        .list_published(filter, params.page.as_deref(), POSTS_PER_PAGE)
        .await?;
    let items = build_cards(&db, page.posts).await?;

    messages.render(CategoryPage {
        category: category.into(),
        posts: PaginatedResponse::new(items, page.total, page.page, POSTS_PER_PAGE),
        categories: category_summaries(&db).await?,
    })
}

#[utoipa::path(
    get,
    path = "/{slug}/",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post, comments, comment form and related posts", body = ApiResponse<DetailPage>),
        (status = 404, description = "No published post with this slug", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn post_detail(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Path(slug): Path<String>,
    messages: Messages,
) -> AppResult<Response> {
    let service = PostService::new(db.clone());
    let mut post = service.get_published_by_slug(&slug).await?;
    service.increment_views(post.id).await?;
    post.views += 1;

    let page = detail_page(
        &db,
        post,
        auth_user.as_ref(),
        BoundForm::unbound(CommentForm::default()),
    )
    .await?;
    messages.render(page)
}

#[utoipa::path(
    get,
    path = "/post/new/",
    responses(
        (status = 200, description = "Empty post form", body = ApiResponse<PostFormPage>),
        (status = 303, description = "Not logged in, redirect to the login page"),
    ),
    tag = "blog"
)]
pub async fn new_post_page(
    Extension(db): Extension<DatabaseConnection>,
    _auth_user: AuthUser,
    messages: Messages,
) -> AppResult<Response> {
    messages.render(PostFormPage {
        form: BoundForm::unbound(PostForm {
            status: PostStatus::Draft.as_str().to_string(),
            ..Default::default()
        }),
        categories: category_summaries(&db).await?,
        post: None,
    })
}

#[utoipa::path(
    post,
    path = "/post/new/",
    request_body(content = PostForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Post created, redirect to its detail page"),
        (status = 400, description = "Form errors", body = ApiResponse<PostFormPage>),
    ),
    tag = "blog"
)]
pub async fn create_post(
    Extension(db): Extension<DatabaseConnection>,
    Extension(media): Extension<MediaConfig>,
    auth_user: AuthUser,
    mut messages: Messages,
    mut form: FormData,
) -> AppResult<Response> {
    let data = PostForm::from_form(&form);
    let (cleaned, thumbnail) = match clean_post_submission(&db, &data, &mut form).await? {
        Ok(valid) => valid,
        Err(errors) => {
            return messages.render_invalid(PostFormPage {
                form: BoundForm::with_errors(data, errors),
                categories: category_summaries(&db).await?,
                post: None,
            });
        }
    };

    let service = PostService::new(db).reserving(media.url_segment());
    let thumbnail = store_thumbnail(media, thumbnail).await?;
    let post = service
        .create(auth_user.user_id, cleaned.into_input(thumbnail))
        .await?;

    messages.success("Post created successfully!");
    messages.redirect(&detail_url(&post.slug))
}

#[utoipa::path(
    get,
    path = "/post/{slug}/edit/",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post form bound to the post", body = ApiResponse<PostFormPage>),
        (status = 303, description = "Not allowed to edit, redirect to the post"),
        (status = 404, description = "Unknown post", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn edit_post_page(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    mut messages: Messages,
) -> AppResult<Response> {
    let post = PostService::new(db.clone()).get_by_slug(&slug).await?;
    if !auth_user.can_modify(post.author_id) {
        messages.error("You cannot edit this post.");
        return messages.redirect(&detail_url(&post.slug));
    }

    messages.render(PostFormPage {
        form: BoundForm::unbound(PostForm::from_post(&post)),
        categories: category_summaries(&db).await?,
        post: Some(PostRef::from(&post)),
    })
}

#[utoipa::path(
    post,
    path = "/post/{slug}/edit/",
    params(("slug" = String, Path, description = "Post slug")),
    request_body(content = PostForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Post updated (or not allowed), redirect to the post"),
        (status = 400, description = "Form errors", body = ApiResponse<PostFormPage>),
        (status = 404, description = "Unknown post", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn update_post(
    Extension(db): Extension<DatabaseConnection>,
    Extension(media): Extension<MediaConfig>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    mut messages: Messages,
    mut form: FormData,
) -> AppResult<Response> {
    let service = PostService::new(db.clone());
    let post = service.get_by_slug(&slug).await?;
    if !auth_user.can_modify(post.author_id) {
        messages.error("You cannot edit this post.");
        return messages.redirect(&detail_url(&post.slug));
    }

    let data = PostForm::from_form(&form);
    let (cleaned, thumbnail) = match clean_post_submission(&db, &data, &mut form).await? {
        Ok(valid) => valid,
        Err(errors) => {
            return messages.render_invalid(PostFormPage {
                form: BoundForm::with_errors(data, errors),
                categories: category_summaries(&db).await?,
                post: Some(PostRef::from(&post)),
            });
        }
    };

    let thumbnail = store_thumbnail(media, thumbnail).await?;
    let updated = service.update(post, cleaned.into_input(thumbnail)).await?;

    messages.success("Post updated!");
    messages.redirect(&detail_url(&updated.slug))
}

#[utoipa::path(
    get,
    path = "/post/{slug}/delete/",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Delete confirmation", body = ApiResponse<DeletePage>),
        (status = 303, description = "Not allowed to delete, redirect to the post"),
        (status = 404, description = "Unknown post", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn delete_post_page(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    mut messages: Messages,
) -> AppResult<Response> {
    let post = PostService::new(db).get_by_slug(&slug).await?;
    if !auth_user.can_modify(post.author_id) {
        messages.error("You cannot delete this post.");
        return messages.redirect(&detail_url(&post.slug));
    }

    messages.render(DeletePage {
        post: PostRef::from(&post),
    })
}

#[utoipa::path(
    post,
    path = "/post/{slug}/delete/",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 303, description = "Post deleted (redirect to /) or not allowed (redirect to the post)"),
        (status = 404, description = "Unknown post", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn delete_post(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    Path(slug): Path<String>,
    mut messages: Messages,
) -> AppResult<Response> {
    let service = PostService::new(db);
    let post = service.get_by_slug(&slug).await?;
    if !auth_user.can_modify(post.author_id) {
        messages.error("You cannot delete this post.");
        return messages.redirect(&detail_url(&post.slug));
    }

    service.delete(post.id).await?;

    messages.success("Post deleted!");
    messages.redirect("/")
}
