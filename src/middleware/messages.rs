use crate::{
    error::AppResult,
    response::ApiResponse,
    utils::{
        cookie::{append_set_cookie, build_clear_cookie, build_cookie, extract_cookie, MESSAGES_COOKIE},
        flash::{decode_messages, encode_messages, FlashMessage, Level},
    },
};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use std::convert::Infallible;

/// Flash messages for the current request.
///
/// Holds the messages stored by earlier redirects plus any added while
/// handling this request. Finishing with [`Messages::redirect`] carries them
/// over to the next request; finishing with [`Messages::render`] shows them
/// and clears the store.
#[derive(Debug, Default)]
pub struct Messages {
    stored: Vec<FlashMessage>,
    added: Vec<FlashMessage>,
}

impl Messages {
    pub fn add(&mut self, level: Level, message: impl Into<String>) {
        self.added.push(FlashMessage::new(level, message));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.add(Level::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.add(Level::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.add(Level::Error, message);
    }

    fn pending(&self) -> Vec<FlashMessage> {
        self.stored.iter().chain(&self.added).cloned().collect()
    }

    /// `303 See Other` to `location`, keeping every pending message.
    pub fn redirect(self, location: &str) -> AppResult<Response> {
        let mut response = Redirect::to(location).into_response();
        if !self.added.is_empty() {
            if let Some(encoded) = encode_messages(&self.pending()) {
                append_set_cookie(&mut response, &build_cookie(MESSAGES_COOKIE, &encoded, None))?;
            }
        }
        Ok(response)
    }

    /// Render a page context with status 200.
    pub fn render<T: Serialize>(self, data: T) -> AppResult<Response> {
        self.finish(StatusCode::OK, ApiResponse::ok(data))
    }

    /// Re-render a page whose form failed validation (status 400).
    pub fn render_invalid<T: Serialize>(self, data: T) -> AppResult<Response> {
        self.finish(StatusCode::BAD_REQUEST, ApiResponse::invalid(data))
    }

    fn finish<T: Serialize>(self, status: StatusCode, body: ApiResponse<T>) -> AppResult<Response> {
        let had_stored = !self.stored.is_empty();
        let mut response = (status, body.with_messages(self.pending())).into_response();
        if had_stored {
            append_set_cookie(&mut response, &build_clear_cookie(MESSAGES_COOKIE))?;
        }
        Ok(response)
    }
}

impl<S> FromRequestParts<S> for Messages
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let stored = extract_cookie(&parts.headers, MESSAGES_COOKIE)
            .map(|raw| decode_messages(&raw))
            .unwrap_or_default();
        Ok(Self {
            stored,
            added: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn stored(messages: Vec<FlashMessage>) -> Messages {
        Messages {
            stored: messages,
            added: Vec::new(),
        }
    }

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn redirect_stores_added_messages() {
        let mut messages = Messages::default();
        messages.success("Post deleted!");
        let response = messages.redirect("/").unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        let value = cookies[0]
            .strip_prefix("messages=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(
            decode_messages(value),
            vec![FlashMessage::new(Level::Success, "Post deleted!")]
        );
    }

    #[test]
    fn redirect_without_new_messages_leaves_store_alone() {
        let messages = stored(vec![FlashMessage::new(Level::Info, "old")]);
        let response = messages.redirect("/").unwrap();
        assert!(set_cookies(&response).is_empty());
    }

    #[test]
    fn render_clears_stored_messages() {
        let messages = stored(vec![FlashMessage::new(Level::Info, "You have been logged out.")]);
        let response = messages.render(serde_json::json!({})).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("messages=;"));
    }

    #[test]
    fn render_invalid_is_bad_request() {
        let response = Messages::default()
            .render_invalid(serde_json::json!({}))
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(set_cookies(&response).is_empty());
    }
}
