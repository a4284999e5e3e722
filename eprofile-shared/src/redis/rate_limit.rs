/// Redis token-bucket rate limiter
///
/// Each key owns a bucket of `per_minute` tokens that refills continuously at
/// `per_minute / 60` tokens per second. A request takes one token. The bucket
/// lives in a Redis hash (`tokens`, `ts`) and is updated by a Lua script so
/// concurrent API instances share it atomically. Idle buckets expire after
/// two minutes.

use std::time::{SystemTime, UNIX_EPOCH};

use super::client::{RedisClient, StoreError};

const KEY_PREFIX: &str = "ratelimit:";
const BUCKET_TTL_SECS: u64 = 120;

const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_per_ms = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local ttl = tonumber(ARGV[4])

local bucket = redis.call('HMGET', key, 'tokens', 'ts')
local tokens = tonumber(bucket[1])
local ts = tonumber(bucket[2])

if not tokens then
    tokens = capacity
    ts = now
end

tokens = math.min(capacity, tokens + math.max(0, now - ts) * refill_per_ms)

local allowed = 0
if tokens >= 1 then
    tokens = tokens - 1
    allowed = 1
end

redis.call('HSET', key, 'tokens', tostring(tokens), 'ts', now)
redis.call('EXPIRE', key, ttl)

local retry_ms = 0
if allowed == 0 then
    retry_ms = math.ceil((1 - tokens) / refill_per_ms)
end

return {allowed, math.floor(tokens), retry_ms}
"#;

/// Outcome of a bucket check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,

    /// Bucket capacity
    pub limit: u32,

    /// Whole tokens left after this request
    pub remaining: u32,

    /// Seconds until one token is available, zero when allowed
    pub retry_after_secs: u64,
}

/// Shared limiter for one class of requests
#[derive(Clone)]
pub struct RateLimiter {
    client: RedisClient,
    per_minute: u32,
}

impl RateLimiter {
    pub fn new(client: RedisClient, per_minute: u32) -> Self {
        Self {
            client,
            per_minute: per_minute.max(1),
        }
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// Tokens regained per millisecond
    fn refill_per_ms(&self) -> f64 {
        self.per_minute as f64 / 60_000.0
    }

    /// Takes a token from the bucket for `key`
    ///
    /// # Errors
    ///
    /// Fails when Redis is unreachable or the script errors; callers decide
    /// whether to let the request through.
    pub async fn check(&self, key: &str) -> Result<RateDecision, StoreError> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let script = redis::Script::new(TOKEN_BUCKET_SCRIPT);
        let mut invocation = script.key(format!("{}{}", KEY_PREFIX, key));
        invocation
            .arg(self.per_minute)
            .arg(self.refill_per_ms())
            .arg(now_ms)
            .arg(BUCKET_TTL_SECS);

        let reply: (i64, i64, i64) = self
            .client
            .run("rate limit script", |mut conn| async move {
                invocation.invoke_async(&mut conn).await
            })
            .await?;

        Ok(decision_from_reply(self.per_minute, reply))
    }
}

fn decision_from_reply(limit: u32, (allowed, remaining, retry_ms): (i64, i64, i64)) -> RateDecision {
    let allowed = allowed == 1;
    let retry_after_secs = if allowed {
        0
    } else {
        ((retry_ms.max(0) as u64 + 999) / 1000).max(1)
    };

    RateDecision {
        allowed,
        limit,
        remaining: remaining.max(0) as u32,
        retry_after_secs,
    }
}
