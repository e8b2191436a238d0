use crate::config::media::MediaConfig;
use crate::error::AppResult;
use crate::middleware::{AuthUser, Messages};
use crate::models::UserModel;
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::services::upload::{UploadService, AVATARS_DIR};
use crate::services::user::UserService;
use crate::utils::form::{BoundForm, FormData, FormErrors};
use axum::{response::Response, Extension};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

pub const PROFILE_URL: &str = "/accounts/profile/";

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    /// Public URL of the uploaded avatar
    pub avatar: Option<String>,
    pub is_staff: bool,
    pub created_at: chrono::NaiveDateTime,
}

impl From<UserModel> for UserProfileResponse {
    fn from(u: UserModel) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            bio: u.bio,
            avatar: u.avatar,
            is_staff: u.is_staff,
            created_at: u.created_at,
        }
    }
}

/// Text fields of the profile form; `avatar` arrives as a multipart file.
#[derive(Debug, Default, Serialize, Validate, ToSchema)]
pub struct ProfileForm {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Enter a valid email address.")
    )]
    pub email: String,
    #[validate(length(max = 500, message = "Ensure this value has at most 500 characters."))]
    pub bio: String,
}

impl ProfileForm {
    fn from_form(form: &FormData) -> Self {
        Self {
            email: form.text("email").trim().to_lowercase(),
            bio: form.text("bio").trim().to_string(),
        }
    }

    fn from_user(user: &UserModel) -> Self {
        Self {
            email: user.email.clone(),
            bio: user.bio.clone().unwrap_or_default(),
        }
    }

    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => FormErrors::from(e),
        };
        if self.email.is_empty() {
            errors.remove("email");
            errors.add("email", "This field is required.");
        }
        errors.into_result(())
    }

    fn bio_value(&self) -> Option<String> {
        Some(self.bio.clone()).filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfilePage {
    pub user: UserProfileResponse,
    pub form: BoundForm<ProfileForm>,
}

#[utoipa::path(
    get,
    path = "/accounts/profile/",
    responses(
        (status = 200, description = "Profile form bound to the current user", body = ApiResponse<ProfilePage>),
        (status = 303, description = "Not logged in, redirect to the login page"),
    ),
    tag = "accounts"
)]
pub async fn profile_page(
    Extension(db): Extension<DatabaseConnection>,
    auth_user: AuthUser,
    messages: Messages,
) -> AppResult<Response> {
    let user = AuthService::new(db).get_user(auth_user.user_id).await?;
    let form = BoundForm::unbound(ProfileForm::from_user(&user));
    messages.render(ProfilePage {
        user: user.into(),
        form,
    })
}

#[utoipa::path(
    post,
    path = "/accounts/profile/",
    request_body(content = ProfileForm, content_type = "multipart/form-data"),
    responses(
        (status = 303, description = "Profile saved, redirect back to the profile page"),
        (status = 400, description = "Form errors", body = ApiResponse<ProfilePage>),
    ),
    tag = "accounts"
)]
pub async fn update_profile(
    Extension(db): Extension<DatabaseConnection>,
    Extension(media): Extension<MediaConfig>,
    auth_user: AuthUser,
    mut messages: Messages,
    mut form: FormData,
) -> AppResult<Response> {
    let user = AuthService::new(db.clone()).get_user(auth_user.user_id).await?;
    let service = UserService::new(db);

    let data = ProfileForm::from_form(&form);
    let mut errors = data.clean().err().unwrap_or_default();
    if !errors.has("email") && service.email_taken_by_other(user.id, &data.email).await? {
        errors.add("email", "A user with that email already exists.");
    }

    let avatar = UploadService::take_image(&mut form, "avatar", &mut errors);

    if !errors.is_empty() {
        return messages.render_invalid(ProfilePage {
            user: user.into(),
            form: BoundForm::with_errors(data, errors),
        });
    }

    let avatar_url = match avatar {
        Some(image) => Some(UploadService::new(media).save_image(image, AVATARS_DIR).await?),
        None => None,
    };
    service
        .update_profile(user.id, &data.email, data.bio_value(), avatar_url)
        .await?;

    messages.success("Profile updated successfully!");
    messages.redirect(PROFILE_URL)
}
