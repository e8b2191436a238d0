use crate::error::{AppResult, ErrorResponse};
use crate::handlers::post::{detail_page, detail_url, AuthorSummary, DetailPage};
use crate::middleware::{AuthUser, Messages};
use crate::models::{CommentModel, UserModel};
use crate::response::ApiResponse;
use crate::services::comment::{CommentService, COMMENT_MAX_LEN};
use crate::services::post::PostService;
use crate::utils::form::{BoundForm, FormData, FormErrors};
use axum::{extract::Path, response::Response, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CommentForm {
    /// 1-2000 characters
    pub body: String,
}

impl CommentForm {
    fn from_form(form: &FormData) -> Self {
        Self {
            body: form.text("body").to_string(),
        }
    }

    /// The trimmed comment text.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let body = self.body.trim();
        let mut errors = FormErrors::new();
        if body.is_empty() {
            errors.add("body", "This field is required.");
        } else if body.chars().count() > COMMENT_MAX_LEN {
            errors.add(
                "body",
                format!("Ensure this value has at most {COMMENT_MAX_LEN} characters."),
            );
        }
        errors.into_result(body.to_string())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub body: String,
    pub author: Option<AuthorSummary>,
    pub created_at: String,
}

impl CommentResponse {
    pub fn new(c: CommentModel, author: Option<UserModel>) -> Self {
        Self {
            id: c.id,
            body: c.body,
            author: author.map(AuthorSummary::from),
            created_at: c.created_at.to_string(),
        }
    }
}

/// Comment form posted to a post's detail page. Counts as a view like the
/// GET. Anonymous submissions are ignored and the page is shown as usual.
#[utoipa::path(
    post,
    path = "/{slug}/",
    params(("slug" = String, Path, description = "Post slug")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Anonymous visitor, detail page with an empty form", body = ApiResponse<DetailPage>),
        (status = 303, description = "Comment added, redirect back to the post"),
        (status = 400, description = "Form errors", body = ApiResponse<DetailPage>),
        (status = 404, description = "No published post with this slug", body = ErrorResponse),
    ),
    tag = "blog"
)]
pub async fn add_comment(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Path(slug): Path<String>,
    mut messages: Messages,
    form: FormData,
) -> AppResult<Response> {
    let service = PostService::new(db.clone());
    let mut post = service.get_published_by_slug(&slug).await?;
    service.increment_views(post.id).await?;
    post.views += 1;

    let Some(user) = auth_user else {
        let page = detail_page(&db, post, None, BoundForm::unbound(CommentForm::default())).await?;
        return messages.render(page);
    };

    let data = CommentForm::from_form(&form);
    match data.clean() {
        Ok(body) => {
            CommentService::new(db)
                .create(post.id, user.user_id, &body)
                .await?;
            messages.success("Comment added!");
            messages.redirect(&detail_url(&post.slug))
        }
        Err(errors) => {
            let page = detail_page(&db, post, Some(&user), BoundForm::with_errors(data, errors)).await?;
            messages.render_invalid(page)
        }
    }
}
