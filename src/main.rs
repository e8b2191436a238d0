mod config;
mod error;
mod handlers;
mod middleware;
mod migration;
mod models;
mod response;
mod routes;
mod services;
mod utils;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use config::media::MediaConfig;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde_json::json;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        // Accounts
        crate::handlers::auth::register_page,
        crate::handlers::auth::register,
        crate::handlers::auth::login_page,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::user::profile_page,
        crate::handlers::user::update_profile,
        // Blog
        crate::handlers::post::home,
        crate::handlers::post::category_posts,
        crate::handlers::post::post_detail,
        crate::handlers::comment::add_comment,
        crate::handlers::post::new_post_page,
        crate::handlers::post::create_post,
        crate::handlers::post::edit_post_page,
        crate::handlers::post::update_post,
        crate::handlers::post::delete_post_page,
        crate::handlers::post::delete_post,
    ),
    components(
        schemas(
            crate::response::PaginationQuery,
            crate::error::ErrorResponse,
            crate::utils::flash::FlashMessage,
            crate::utils::flash::Level,
            crate::utils::form::FormErrors,
            crate::models::PostStatus,
            // Accounts
            crate::handlers::auth::RegisterForm,
            crate::handlers::auth::LoginForm,
            crate::handlers::auth::RegisterPage,
            crate::handlers::auth::LoginPage,
            crate::handlers::user::ProfileForm,
            crate::handlers::user::ProfilePage,
            crate::handlers::user::UserProfileResponse,
            // Blog
            crate::handlers::post::PostForm,
            crate::handlers::post::PostCard,
            crate::handlers::post::PostDetail,
            crate::handlers::post::PostRef,
            crate::handlers::post::AuthorSummary,
            crate::handlers::post::CategorySummary,
            crate::handlers::post::HomePage,
            crate::handlers::post::CategoryPage,
            crate::handlers::post::DetailPage,
            crate::handlers::post::PostFormPage,
            crate::handlers::post::DeletePage,
            crate::handlers::comment::CommentForm,
            crate::handlers::comment::CommentResponse,
        )
    ),
    tags(
        (name = "accounts", description = "Registration, login and profile pages"),
        (name = "blog", description = "Listings, post pages and comments"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flixblog=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration before doing anything else
    let (jwt_config, media) = validate_config()?;

    utils::jwt::init_jwt_config(jwt_config)?;

    tracing::info!("Starting flixblog v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database().await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    services::bootstrap::ensure_bootstrap_staff(&db).await?;
    services::bootstrap::ensure_seed_categories(&db).await?;

    let app = create_app(&media)
        .layer(Extension(db))
        .layer(Extension(media));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(config::jwt::JwtConfig, MediaConfig)> {
    let jwt_config = config::jwt::JwtConfig::from_env()?;

    // Presence only; the connection is opened later in main.
    if env::var("DATABASE_URL").is_err() {
        return Err(anyhow::anyhow!(
            "DATABASE_URL environment variable must be set"
        ));
    }

    let media = MediaConfig::from_env();
    std::fs::create_dir_all(&media.root).map_err(|e| {
        anyhow::anyhow!("Failed to create media directory '{}': {}", media.root, e)
    })?;

    Ok((jwt_config, media))
}

fn build_cors_layer() -> CorsLayer {
    use axum::http::{header, HeaderValue, Method};

    let origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins_str == "*" {
        cors.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = origins_str
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

fn create_app(media: &MediaConfig) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .merge(routes::create_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service(&media.url, ServeDir::new(&media.root))
        .layer(axum::middleware::from_fn(
            middleware::security::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Health check successful", body = serde_json::Value)
    )
)]
async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let db_ok = db.ping().await.is_ok();
    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "service": "flixblog",
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_ok,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
