use crate::error::{AppError, AppResult};
use anyhow::anyhow;
use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::Response,
};
use std::{env, sync::OnceLock};

pub const SESSION_COOKIE: &str = "session";
pub const MESSAGES_COOKIE: &str = "messages";

#[derive(Debug, Clone)]
struct CookieConfig {
    secure: bool,
    same_site: &'static str,
    domain: Option<String>,
}

impl CookieConfig {
    fn from_env() -> Self {
        let same_site = parse_same_site(
            &env::var("AUTH_COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()),
        );
        let mut secure = parse_bool_env("AUTH_COOKIE_SECURE", false);
        let domain = env::var("AUTH_COOKIE_DOMAIN")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        // Browsers require SameSite=None cookies to also be Secure.
        if same_site == "None" {
            secure = true;
        }

        Self {
            secure,
            same_site,
            domain,
        }
    }

    fn apply_attributes(&self, cookie: &mut String) {
        if self.secure {
            cookie.push_str("; Secure");
        }

        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
    }
}

fn cookie_config() -> &'static CookieConfig {
    static CONFIG: OnceLock<CookieConfig> = OnceLock::new();
    CONFIG.get_or_init(CookieConfig::from_env)
}

pub fn parse_bool_env(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .and_then(|value| parse_bool(&value))
        .unwrap_or(default)
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn parse_same_site(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

/// HttpOnly cookie scoped to the whole site. `max_age_seconds: None` makes a
/// browser-session cookie.
pub fn build_cookie(name: &str, value: &str, max_age_seconds: Option<u64>) -> String {
    let config = cookie_config();
    let mut cookie = format!("{name}={value}; Path=/");
    if let Some(max_age) = max_age_seconds {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    cookie.push_str(&format!("; HttpOnly; SameSite={}", config.same_site));
    config.apply_attributes(&mut cookie);
    cookie
}

pub fn build_clear_cookie(name: &str) -> String {
    let config = cookie_config();
    let mut cookie = format!(
        "{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite={}",
        config.same_site
    );
    config.apply_attributes(&mut cookie);
    cookie
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| {
            cookie_header.split(';').find_map(|cookie| {
                let mut parts = cookie.trim().splitn(2, '=');
                let key = parts.next()?.trim();
                let value = parts.next()?.trim();
                if key == name && !value.is_empty() {
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}

pub fn append_set_cookie(response: &mut Response, cookie_value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie_value).map_err(|e| {
        AppError::Internal(anyhow!("Failed to build Set-Cookie header value: {}", e))
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn extracts_named_cookie() {
        let headers = headers_with("theme=dark; session=abc.def; messages=xyz");
        assert_eq!(
            extract_cookie(&headers, SESSION_COOKIE),
            Some("abc.def".to_string())
        );
        assert_eq!(
            extract_cookie(&headers, MESSAGES_COOKIE),
            Some("xyz".to_string())
        );
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_is_absent() {
        let headers = headers_with("session=");
        assert_eq!(extract_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn built_cookie_is_http_only() {
        let cookie = build_cookie(SESSION_COOKIE, "token", Some(60));
        assert!(cookie.starts_with("session=token; Path=/; Max-Age=60"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = build_clear_cookie(MESSAGES_COOKIE);
        assert!(cookie.starts_with("messages=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
