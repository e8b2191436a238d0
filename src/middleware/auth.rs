use crate::{
    error::AppError,
    models::{User, UserModel},
    utils::{
        cookie::{extract_cookie, SESSION_COOKIE},
        jwt::decode_session_token,
    },
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::convert::Infallible;

/// The logged-in user behind the current request.
///
/// Taking `AuthUser` as a handler argument makes the handler login-only:
/// anonymous requests are redirected to the login page with `next` set to
/// the original path. Take `Option<AuthUser>` for pages open to everyone.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_staff: bool,
}

impl AuthUser {
    /// Ownership-or-staff rule for editing and deleting content.
    pub fn can_modify(&self, author_id: i32) -> bool {
        self.user_id == author_id || self.is_staff
    }
}

impl From<&UserModel> for AuthUser {
    fn from(user: &UserModel) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// Session middleware
///
/// Resolves the session cookie to a user and stores it in the request
/// extensions. Never rejects: a missing, expired or forged token, or a token
/// for a deleted user, simply leaves the request anonymous.
pub async fn session_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(user) = resolve_session(&db, &headers).await {
        request.extensions_mut().insert(AuthUser::from(&user));
    }

    next.run(request).await
}

async fn resolve_session(db: &DatabaseConnection, headers: &HeaderMap) -> Option<UserModel> {
    let token = extract_cookie(headers, SESSION_COOKIE)?;
    let claims = decode_session_token(&token).ok()?;
    let user_id: i32 = claims.sub.parse().ok()?;

    match User::find_by_id(user_id).one(db).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!("Failed to load session user {}: {}", user_id, e);
            None
        }
    }
}

fn requested_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::LoginRequired(requested_path(parts)))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i32, is_staff: bool) -> AuthUser {
        AuthUser {
            user_id: id,
            username: format!("user{id}"),
            is_staff,
        }
    }

    #[test]
    fn author_can_modify_own_content() {
        assert!(user(1, false).can_modify(1));
    }

    #[test]
    fn stranger_cannot_modify() {
        assert!(!user(2, false).can_modify(1));
    }

    #[test]
    fn staff_can_modify_anything() {
        assert!(user(3, true).can_modify(1));
    }

    #[tokio::test]
    async fn anonymous_extraction_remembers_path() {
        let request = axum::http::Request::builder()
            .uri("/post/new/?draft=1")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let err = <AuthUser as FromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        match err {
            AppError::LoginRequired(next) => assert_eq!(next, "/post/new/?draft=1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn optional_extraction_is_none_for_anonymous() {
        let request = axum::http::Request::builder().uri("/").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let user = <AuthUser as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
