//! # eProfile Shared Library
//!
//! Types, persistence and business rules shared by the eProfile API server
//! and the background worker.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, JWT sessions, ownership checks, HMAC signatures
//! - `billing`: plan purchase, expiry and invoices
//! - `db`: connection pool and migrations
//! - `models`: database models
//! - `plans`: plan tiers and per-plan limits
//! - `redis`: optional Redis client used for rate limiting

pub mod auth;
pub mod billing;
pub mod db;
pub mod models;
pub mod plans;
pub mod redis;

/// Current version of the eProfile shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
