/// Redis integration
///
/// Redis is optional for eProfile. When `REDIS_URL` is set the API uses it
/// to hold per-client token buckets for the public endpoints; without it
/// requests are never throttled.
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::redis::{RateLimiter, RedisClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::connect("redis://localhost:6379").await?;
/// let limiter = RateLimiter::new(client, 30);
///
/// let decision = limiter.check("public:203.0.113.7").await?;
/// println!("allowed: {}, remaining: {}", decision.allowed, decision.remaining);
/// # Ok(())
/// # }
/// ```

pub mod client;
pub mod rate_limit;

pub use client::{RedisClient, StoreError};
pub use rate_limit::{RateDecision, RateLimiter};
