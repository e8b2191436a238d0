use crate::{
    error::{AppError, AppResult},
    models::{user, User, UserModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn email_taken_by_other(&self, user_id: i32, email: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::Id.ne(user_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Save the profile form. `avatar: None` keeps the current avatar.
    pub async fn update_profile(
        &self,
        user_id: i32,
        email: &str,
        bio: Option<String>,
        avatar: Option<String>,
    ) -> AppResult<UserModel> {
        let existing = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = chrono::Utc::now().naive_utc();

        let mut active: user::ActiveModel = existing.into();
        active.email = sea_orm::ActiveValue::Set(email.to_string());
        active.bio = sea_orm::ActiveValue::Set(bio);
        if let Some(url) = avatar {
            active.avatar = sea_orm::ActiveValue::Set(Some(url));
        }
        active.updated_at = sea_orm::ActiveValue::Set(now);

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }
}
