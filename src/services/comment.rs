use crate::{
    error::AppResult,
    models::{comment, Comment, CommentModel, User, UserModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

pub const COMMENT_MAX_LEN: usize = 2000;

pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Active comments on a post, newest first, each with its author.
    pub async fn list_active(&self, post_id: i32) -> AppResult<Vec<(CommentModel, Option<UserModel>)>> {
        let comments = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .filter(comment::Column::Active.eq(true))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .find_also_related(User)
            .all(&self.db)
            .await?;
        Ok(comments)
    }

    pub async fn create(&self, post_id: i32, author_id: i32, body: &str) -> AppResult<CommentModel> {
        let now = chrono::Utc::now().naive_utc();

        let new_comment = comment::ActiveModel {
            post_id: sea_orm::ActiveValue::Set(post_id),
            author_id: sea_orm::ActiveValue::Set(author_id),
            body: sea_orm::ActiveValue::Set(body.to_string()),
            active: sea_orm::ActiveValue::Set(true),
            created_at: sea_orm::ActiveValue::Set(now),
            ..Default::default()
        };

        let comment = new_comment.insert(&self.db).await?;
        tracing::debug!("Comment {} added to post {}", comment.id, post_id);
        Ok(comment)
    }
}
