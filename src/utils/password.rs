use anyhow::{Context, Result};
use std::env;

/// bcrypt work factor; `BCRYPT_COST` overrides the library default.
fn bcrypt_cost() -> u32 {
    env::var("BCRYPT_COST")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|cost| (4..=31).contains(cost))
        .unwrap_or(bcrypt::DEFAULT_COST)
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt_cost()).context("Failed to hash password")
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}
