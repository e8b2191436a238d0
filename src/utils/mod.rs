pub mod cookie;
pub mod flash;
pub mod form;
pub mod jwt;
pub mod markdown;
pub mod password;
pub mod slug;

pub use jwt::encode_session_token;
pub use markdown::{excerpt, render_markdown};
pub use password::{hash_password, verify_password};
pub use slug::{is_reserved, slug_prefix, slugify, unique_slug};
