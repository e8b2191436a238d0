pub mod auth;
pub mod messages;
pub mod security;

pub use auth::AuthUser;
pub use messages::Messages;
