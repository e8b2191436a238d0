use crate::{
    error::{AppError, AppResult},
    models::{user, User, UserModel},
    utils::{form::FormErrors, hash_password, verify_password},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    SqlErr,
};

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Field errors for a username or email that already belongs to someone.
    pub async fn check_available(&self, username: &str, email: &str) -> AppResult<FormErrors> {
        let mut errors = FormErrors::new();

        let username_taken = User::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.db)
            .await?
            > 0;
        if username_taken {
            errors.add("username", "A user with that username already exists.");
        }

        let email_taken = User::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await?
            > 0;
        if email_taken {
            errors.add("email", "A user with that email already exists.");
        }

        Ok(errors)
    }

    /// Create a regular (non-staff) account. Callers check availability
    /// first; a concurrent duplicate still fails on the unique indexes.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<UserModel> {
        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().naive_utc();

        let new_user = user::ActiveModel {
            username: sea_orm::ActiveValue::Set(username.to_string()),
            email: sea_orm::ActiveValue::Set(email.to_string()),
            password_hash: sea_orm::ActiveValue::Set(password_hash),
            bio: sea_orm::ActiveValue::Set(None),
            avatar: sea_orm::ActiveValue::Set(None),
            is_staff: sea_orm::ActiveValue::Set(false),
            created_at: sea_orm::ActiveValue::Set(now),
            updated_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let user = new_user.insert(&self.db).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
                AppError::Validation("Username or email already exists".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        tracing::info!("User registered: {} (id {})", user.username, user.id);
        Ok(user)
    }

    /// `None` for an unknown username or a wrong password; the two cases are
    /// deliberately indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<UserModel>> {
        let Some(user) = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    pub async fn get_user(&self, user_id: i32) -> AppResult<UserModel> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }
}
