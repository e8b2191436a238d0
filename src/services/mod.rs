pub mod auth;
pub mod bootstrap;
pub mod category;
pub mod comment;
pub mod post;
pub mod upload;
pub mod user;
