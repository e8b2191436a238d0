use crate::error::{AppResult, ErrorResponse};
use crate::middleware::{AuthUser, Messages};
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::utils::{
    cookie::{append_set_cookie, build_clear_cookie, build_cookie, SESSION_COOKIE},
    encode_session_token,
    form::{BoundForm, FormData, FormErrors},
    jwt::session_expiry_seconds,
};
use axum::{extract::Query, response::Response, Extension};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

const REQUIRED: &str = "This field is required.";
const BAD_CREDENTIALS: &str = "Please enter a correct username and password.";

#[derive(Debug, Default, Serialize, Validate, ToSchema)]
pub struct RegisterForm {
    /// 150 characters or fewer. Letters, digits and @/./+/-/_ only.
    #[validate(
        length(min = 1, max = 150, message = "Enter a username of at most 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Enter a valid email address.")
    )]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if username.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(Cow::Borrowed(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        )))
    }
}

impl RegisterForm {
    fn from_form(form: &FormData) -> Self {
        Self {
            username: form.text("username").trim().to_string(),
            email: form.text("email").trim().to_lowercase(),
            password1: form.text("password1").to_string(),
            password2: form.text("password2").to_string(),
        }
    }

    /// Field rules plus the checks spanning both password inputs.
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };

        for (field, value) in [
            ("username", &self.username),
            ("email", &self.email),
            ("password1", &self.password1),
        ] {
            if value.is_empty() {
                errors.remove(field);
                errors.add(field, REQUIRED);
            }
        }
        if !self.password1.is_empty() && self.password1.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password1", "This password is entirely numeric.");
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        errors.into_result(())
    }
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Where to go after logging in
    pub next: String,
}

impl LoginForm {
    fn from_form(form: &FormData, query_next: Option<String>) -> Self {
        let next = form
            .opt_text("next")
            .map(str::to_string)
            .or(query_next)
            .unwrap_or_default();
        Self {
            username: form.text("username").trim().to_string(),
            password: form.text("password").to_string(),
            next,
        }
    }

    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.username.is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct NextQuery {
    /// Same-site path to continue to after logging in
    pub next: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterPage {
    pub form: BoundForm<RegisterForm>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginPage {
    pub form: BoundForm<LoginForm>,
}

/// Post-login redirect target, if it stays on this site. Only plain
/// absolute paths qualify: `//host` and `/\host` are treated as external.
pub fn safe_next(next: &str) -> Option<&str> {
    let is_local = next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\");
    if is_local && next.chars().all(|c| c.is_ascii_graphic()) {
        Some(next)
    } else {
        None
    }
}

/// Attach a fresh session cookie for `user_id`.
pub(crate) fn start_session(response: &mut Response, user_id: i32) -> AppResult<()> {
    let token = encode_session_token(user_id)?;
    let cookie = build_cookie(SESSION_COOKIE, &token, Some(session_expiry_seconds()));
    append_set_cookie(response, &cookie)
}

#[utoipa::path(
    get,
    path = "/accounts/register/",
    responses(
        (status = 200, description = "Empty registration form", body = ApiResponse<RegisterPage>),
        (status = 303, description = "Already logged in, redirect to /"),
    ),
    tag = "accounts"
)]
pub async fn register_page(auth_user: Option<AuthUser>, messages: Messages) -> AppResult<Response> {
    if auth_user.is_some() {
        return messages.redirect("/");
    }
    messages.render(RegisterPage {
        form: BoundForm::unbound(RegisterForm::default()),
    })
}

#[utoipa::path(
    post,
    path = "/accounts/register/",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created and logged in, redirect to /"),
        (status = 400, description = "Form errors", body = ApiResponse<RegisterPage>),
    ),
    tag = "accounts"
)]
pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    mut messages: Messages,
    form: FormData,
) -> AppResult<Response> {
    if auth_user.is_some() {
        return messages.redirect("/");
    }

    let data = RegisterForm::from_form(&form);
    let service = AuthService::new(db);

    let mut errors = data.clean().err().unwrap_or_default();
    if !errors.has("username") || !errors.has("email") {
        let taken = service.check_available(&data.username, &data.email).await?;
        errors.merge_missing(taken);
    }
    if !errors.is_empty() {
        return messages.render_invalid(RegisterPage {
            form: BoundForm::with_errors(data, errors),
        });
    }

    let user = service
        .register(&data.username, &data.email, &data.password1)
        .await?;

    messages.success("Registration successful!");
    let mut response = messages.redirect("/")?;
    start_session(&mut response, user.id)?;
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/accounts/login/",
    params(NextQuery),
    responses(
        (status = 200, description = "Empty login form", body = ApiResponse<LoginPage>),
        (status = 303, description = "Already logged in, redirect to /"),
    ),
    tag = "accounts"
)]
pub async fn login_page(
    auth_user: Option<AuthUser>,
    Query(query): Query<NextQuery>,
    messages: Messages,
) -> AppResult<Response> {
    if auth_user.is_some() {
        return messages.redirect("/");
    }
    messages.render(LoginPage {
        form: BoundForm::unbound(LoginForm {
            next: query.next.unwrap_or_default(),
            ..Default::default()
        }),
    })
}

#[utoipa::path(
    post,
    path = "/accounts/login/",
    params(NextQuery),
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, redirect to `next` or /"),
        (status = 400, description = "Form errors", body = ApiResponse<LoginPage>),
    ),
    tag = "accounts"
)]
pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: Option<AuthUser>,
    Query(query): Query<NextQuery>,
    mut messages: Messages,
    form: FormData,
) -> AppResult<Response> {
    if auth_user.is_some() {
        return messages.redirect("/");
    }

    let data = LoginForm::from_form(&form, query.next);
    let mut errors = data.clean().err().unwrap_or_default();

    if errors.is_empty() {
        match AuthService::new(db)
            .authenticate(&data.username, &data.password)
            .await?
        {
            Some(user) => {
                tracing::debug!("User {} logged in", user.id);
                messages.success(format!("Welcome back, {}!", user.username));
                let target = safe_next(&data.next).unwrap_or("/");
                let mut response = messages.redirect(target)?;
                start_session(&mut response, user.id)?;
                return Ok(response);
            }
            None => errors.add(FormErrors::NON_FIELD, BAD_CREDENTIALS),
        }
    }

    messages.render_invalid(LoginPage {
        form: BoundForm::with_errors(data, errors),
    })
}

#[utoipa::path(
    post,
    path = "/accounts/logout/",
    responses(
        (status = 303, description = "Session ended, redirect to /"),
        (status = 500, description = "Internal error", body = ErrorResponse),
    ),
    tag = "accounts"
)]
pub async fn logout(_auth_user: AuthUser, mut messages: Messages) -> AppResult<Response> {
    messages.info("You have been logged out.");
    let mut response = messages.redirect("/")?;
    append_set_cookie(&mut response, &build_clear_cookie(SESSION_COOKIE))?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_form(fields: &[(&str, &str)]) -> RegisterForm {
        RegisterForm::from_form(&FormData::from_fields(fields.iter().copied()))
    }

    #[test]
    fn safe_next_accepts_local_paths() {
        assert_eq!(safe_next("/some/relative/path"), Some("/some/relative/path"));
        assert_eq!(safe_next("/?page=2"), Some("/?page=2"));
    }

    #[test]
    fn safe_next_rejects_external_targets() {
        assert_eq!(safe_next("http://evil.example/x"), None);
        assert_eq!(safe_next("//evil.example/x"), None);
        assert_eq!(safe_next("/\\evil.example"), None);
        assert_eq!(safe_next("relative/path"), None);
        assert_eq!(safe_next(""), None);
        assert_eq!(safe_next("/a\r\nSet-Cookie: x=y"), None);
    }

    #[test]
    fn valid_registration_is_clean() {
        let form = register_form(&[
            ("username", "ana.m+reviews"),
            ("email", " Ana@Example.com "),
            ("password1", "correct-horse"),
            ("password2", "correct-horse"),
        ]);
        assert!(form.clean().is_ok());
        assert_eq!(form.email, "ana@example.com");
    }

    #[test]
    fn registration_password_rules() {
        let form = register_form(&[
            ("username", "ana"),
            ("email", "ana@example.com"),
            ("password1", "12345678"),
            ("password2", "12345679"),
        ]);
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors.get("password1"),
            Some(&["This password is entirely numeric.".to_string()][..])
        );
        assert_eq!(
            errors.get("password2"),
            Some(&["The two password fields didn't match.".to_string()][..])
        );
    }

    #[test]
    fn registration_rejects_bad_username_and_email() {
        let form = register_form(&[
            ("username", "ana smith!"),
            ("email", "not-an-email"),
            ("password1", "correct-horse"),
            ("password2", "correct-horse"),
        ]);
        let errors = form.clean().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("email"));
        assert!(!errors.has("password1"));
    }

    #[test]
    fn registration_requires_every_field() {
        let errors = register_form(&[]).clean().unwrap_err();
        for field in ["username", "email", "password1", "password2"] {
            assert!(errors.has(field), "missing error for {field}");
        }
        assert_eq!(errors.get("password1"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn login_next_prefers_body_over_query() {
        let form = FormData::from_fields([("username", "ana"), ("password", "pw"), ("next", "/a/")]);
        let data = LoginForm::from_form(&form, Some("/b/".to_string()));
        assert_eq!(data.next, "/a/");

        let form = FormData::from_fields([("username", "ana"), ("password", "pw")]);
        let data = LoginForm::from_form(&form, Some("/b/".to_string()));
        assert_eq!(data.next, "/b/");
    }

    #[test]
    fn login_requires_both_fields() {
        let data = LoginForm::from_form(&FormData::default(), None);
        let errors = data.clean().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn passwords_never_echoed() {
        let form = register_form(&[("username", "ana"), ("password1", "secret-pass")]);
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password1").is_none());
        assert!(json.get("password2").is_none());
        assert_eq!(json["username"], "ana");
    }
}
