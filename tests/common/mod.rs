#![allow(dead_code)]

use flixblog::config::media::MediaConfig;
use flixblog::models::{post, user, CategoryModel, Post, PostModel, PostStatus, User};
use flixblog::services::category::CategoryService;
use flixblog::services::post::{PostInput, PostService};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Once;

static INIT: Once = Once::new();

pub const PASSWORD: &str = "correct-horse-battery";

fn init_env() {
    INIT.call_once(|| {
        std::env::set_var(
            "JWT_SECRET",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        // Cheap hashing keeps the suite fast.
        std::env::set_var("BCRYPT_COST", "4");
        let config = flixblog::config::jwt::JwtConfig::from_env().unwrap();
        let _ = flixblog::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub media_root: PathBuf,
    /// Anonymous client; use [`TestApp::client`] for fresh sessions.
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A new browser: own cookie jar, redirects not followed.
    pub fn client(&self) -> Client {
        new_client()
    }

    /// Register `username` with a fresh client, which ends up logged in.
    pub async fn signup(&self, username: &str) -> (Client, i32) {
        let client = self.client();
        let email = format!("{username}@example.com");
        let resp = client
            .post(self.url("/accounts/register/"))
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ])
            .send()
            .await
            .expect("Failed to register user");
        if resp.status() != StatusCode::SEE_OTHER {
            panic!(
                "registration of {username} failed: status={}, body={}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            );
        }

        let user = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .unwrap()
            .expect("registered user missing");

        // Consume the "Registration successful!" flash.
        client.get(self.url("/")).send().await.unwrap();
        (client, user.id)
    }

    pub async fn make_staff(&self, user_id: i32) {
        let existing = User::find_by_id(user_id).one(&self.db).await.unwrap().unwrap();
        let mut active: user::ActiveModel = existing.into();
        active.is_staff = sea_orm::ActiveValue::Set(true);
        active.update(&self.db).await.unwrap();
    }

    pub async fn create_category(&self, name: &str) -> CategoryModel {
        CategoryService::new(self.db.clone())
            .ensure(name)
            .await
            .unwrap()
    }

    /// Insert a published, non-featured post directly.
    pub async fn create_post(&self, author_id: i32, title: &str) -> PostModel {
        self.create_post_with(author_id, title, PostStatus::Published, false, None)
            .await
    }

    pub async fn create_post_with(
        &self,
        author_id: i32,
        title: &str,
        status: PostStatus,
        is_featured: bool,
        category_id: Option<i32>,
    ) -> PostModel {
        PostService::new(self.db.clone())
            .create(
                author_id,
                PostInput {
                    title: title.to_string(),
                    body: format!("Body of **{title}**"),
                    category_id,
                    status,
                    is_featured,
                    thumbnail: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn reload_post(&self, id: i32) -> Option<PostModel> {
        Post::find_by_id(id).one(&self.db).await.unwrap()
    }

    pub async fn find_post_by_title(&self, title: &str) -> Option<PostModel> {
        Post::find()
            .filter(post::Column::Title.eq(title))
            .one(&self.db)
            .await
            .unwrap()
    }
}

pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to build client")
}

pub async fn spawn_app() -> TestApp {
    init_env();

    let id = uuid::Uuid::new_v4();
    let db_path = std::env::temp_dir().join(format!("flixblog-test-{id}.db"));
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let db = flixblog::config::database::connect(&database_url, 5, 1)
        .await
        .expect("Failed to connect to test database");
    flixblog::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let media_root = std::env::temp_dir().join(format!("flixblog-media-{id}"));
    std::fs::create_dir_all(&media_root).unwrap();
    let media = MediaConfig::new(media_root.to_string_lossy(), "/media");

    let app = axum::Router::new()
        .merge(flixblog::routes::create_routes())
        .nest_service(
            &media.url,
            tower_http::services::ServeDir::new(&media.root),
        )
        .layer(axum::middleware::from_fn(
            flixblog::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(media));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        media_root,
        client: new_client(),
    }
}

pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// GET `path` and decode the JSON page.
pub async fn get_page(app: &TestApp, client: &Client, path: &str) -> (StatusCode, Value) {
    let resp = client.get(app.url(path)).send().await.unwrap();
    let status = resp.status();
    let body = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}

/// Texts of the flash messages in a rendered page.
pub fn messages(page: &Value) -> Vec<String> {
    page["messages"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|m| m["message"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Bytes of a 1x1 PNG.
pub fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}
