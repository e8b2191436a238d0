use std::env;

/// Where uploaded files live on disk and the URL prefix they are served under.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub root: String,
    pub url: String,
}

impl MediaConfig {
    pub fn from_env() -> Self {
        let root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string());
        let url = env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string());
        Self::new(root, &url)
    }

    pub fn new(root: impl Into<String>, url: &str) -> Self {
        Self {
            root: root.into(),
            url: normalize_url_prefix(url),
        }
    }

    /// First path segment of the URL prefix: `media` for `/media`.
    pub fn url_segment(&self) -> &str {
        self.url
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default()
    }
}

/// `media/`, `/media/` and `/media` all mean `/media`.
fn normalize_url_prefix(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/media".to_string()
    } else {
        format!("/{trimmed}")
    }
}
