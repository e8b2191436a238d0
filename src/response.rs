use crate::utils::flash::FlashMessage;
use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope for every rendered page: the template context plus any flash
/// messages that are due for display.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub messages: Vec<FlashMessage>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            messages: Vec::new(),
        }
    }

    /// A page re-rendered because its form did not validate.
    pub fn invalid(data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            messages: Vec::new(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<FlashMessage>) -> Self {
        self.messages = messages;
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = total_pages(total, per_page);
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaginationQuery {
    /// Raw page number; anything unparsable means the first page
    pub page: Option<String>,
}

pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    }
}

/// Lenient page lookup: a missing or garbage page number gives the first page,
/// one past the end gives the last page. An empty listing still has page 1.
pub fn resolve_page(raw: Option<&str>, total: u64, per_page: u64) -> u64 {
    let last = total_pages(total, per_page).max(1);
    match raw.and_then(|p| p.trim().parse::<i64>().ok()) {
        Some(n) if n >= 1 => (n as u64).min(last),
        Some(_) => last,
        None => 1,
    }
}
