use crate::error::AppResult;
use crate::models::{user, User};
use crate::services::category::CategoryService;
use crate::utils::{cookie::parse_bool_env, hash_password};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;

#[derive(Debug, Clone)]
pub struct BootstrapStaffConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl BootstrapStaffConfig {
    pub fn from_env() -> Option<Self> {
        if !parse_bool_env("BOOTSTRAP_STAFF_ENABLED", false) {
            return None;
        }

        Some(Self {
            username: env::var("BOOTSTRAP_STAFF_USERNAME").ok()?,
            email: env::var("BOOTSTRAP_STAFF_EMAIL").ok()?,
            password: env::var("BOOTSTRAP_STAFF_PASSWORD").ok()?,
        })
    }
}

/// Make sure a staff account exists at start-up:
/// - any staff user already present: nothing to do
/// - the configured username/email exists: promote it
/// - otherwise create a new staff user
pub async fn ensure_bootstrap_staff(db: &DatabaseConnection) -> AppResult<()> {
    let Some(cfg) = BootstrapStaffConfig::from_env() else {
        return Ok(());
    };

    let staff_exists = User::find()
        .filter(user::Column::IsStaff.eq(true))
        .one(db)
        .await?
        .is_some();
    if staff_exists {
        return Ok(());
    }

    let existing = User::find()
        .filter(
            sea_orm::Condition::any()
                .add(user::Column::Email.eq(cfg.email.clone()))
                .add(user::Column::Username.eq(cfg.username.clone())),
        )
        .one(db)
        .await?;

    let now = chrono::Utc::now().naive_utc();

    if let Some(existing) = existing {
        tracing::info!("Promoting {} to staff", existing.username);
        let mut active: user::ActiveModel = existing.into();
        active.is_staff = sea_orm::ActiveValue::Set(true);
        active.updated_at = sea_orm::ActiveValue::Set(now);
        active.update(db).await?;
        return Ok(());
    }

    let password_hash = hash_password(&cfg.password)?;

    let new_user = user::ActiveModel {
        username: sea_orm::ActiveValue::Set(cfg.username.clone()),
        email: sea_orm::ActiveValue::Set(cfg.email),
        password_hash: sea_orm::ActiveValue::Set(password_hash),
        bio: sea_orm::ActiveValue::Set(None),
        avatar: sea_orm::ActiveValue::Set(None),
        is_staff: sea_orm::ActiveValue::Set(true),
        created_at: sea_orm::ActiveValue::Set(now),
        updated_at: sea_orm::ActiveValue::Set(now),
        ..Default::default()
    };

    new_user.insert(db).await?;
    tracing::info!("Created bootstrap staff user {}", cfg.username);
    Ok(())
}

/// Category names from `SEED_CATEGORIES` (comma separated).
pub fn seed_category_names() -> Vec<String> {
    env::var("SEED_CATEGORIES")
        .map(|raw| parse_category_list(&raw))
        .unwrap_or_default()
}

fn parse_category_list(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub async fn ensure_seed_categories(db: &DatabaseConnection) -> AppResult<()> {
    let service = CategoryService::new(db.clone());
    for name in seed_category_names() {
        service.ensure(&name).await?;
    }
    Ok(())
}
