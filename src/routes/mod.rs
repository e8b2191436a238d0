use crate::handlers;
use crate::middleware::auth::session_middleware;
use axum::{extract::DefaultBodyLimit, middleware, routing, Router};

/// Upper bound for form bodies: a 5 MB image plus the text fields.
const MAX_FORM_BODY_BYTES: usize = 6 * 1024 * 1024;

pub fn create_routes() -> Router {
    account_routes()
        .merge(blog_routes())
        .layer(DefaultBodyLimit::max(MAX_FORM_BODY_BYTES))
        .layer(middleware::from_fn(session_middleware))
}

/// Registration, login/logout and the profile page.
fn account_routes() -> Router {
    Router::new()
        .route(
            "/accounts/register/",
            routing::get(handlers::register_page).post(handlers::register),
        )
        .route(
            "/accounts/login/",
            routing::get(handlers::login_page).post(handlers::login),
        )
        .route(
            "/accounts/logout/",
            routing::get(handlers::logout).post(handlers::logout),
        )
        .route(
            "/accounts/profile/",
            routing::get(handlers::user::profile_page).post(handlers::user::update_profile),
        )
}

/// Listings, post CRUD and the detail/comment page. The catch-all
/// `/{slug}/` only matches single-segment paths, so it never shadows the
/// fixed routes.
fn blog_routes() -> Router {
    Router::new()
        .route("/", routing::get(handlers::post::home))
        .route(
            "/category/{slug}/",
            routing::get(handlers::post::category_posts),
        )
        .route(
            "/post/new/",
            routing::get(handlers::post::new_post_page).post(handlers::post::create_post),
        )
        .route(
            "/post/{slug}/edit/",
            routing::get(handlers::post::edit_post_page).post(handlers::post::update_post),
        )
        .route(
            "/post/{slug}/delete/",
            routing::get(handlers::post::delete_post_page).post(handlers::post::delete_post),
        )
        .route(
            "/{slug}/",
            routing::get(handlers::post::post_detail).post(handlers::comment::add_comment),
        )
}
