/// Rate limiting for the public endpoints
///
/// Public card pages, lead submissions and click tracking are unauthenticated,
/// so they are throttled per client IP with the Redis token bucket from
/// `eprofile_shared::redis::RateLimiter`.
///
/// Without Redis, or when Redis errors, requests pass through unthrottled and
/// the failure is logged.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: bucket size per minute
/// - `X-RateLimit-Remaining`: tokens left
/// - `Retry-After`: seconds to wait (429 only)

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

const UNKNOWN_CLIENT: &str = "unknown";

/// Client address used as the bucket key
///
/// First hop of `X-Forwarded-For`, then the socket peer, then `unknown`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware applied to the `/v1/public` routes
pub async fn public_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(request).await);
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    let decision = match limiter.check(&format!("public:{}", ip)).await {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(error = %e, client_ip = %ip, "Rate limit check failed, allowing request");
            return Ok(next.run(request).await);
        }
    };

    if !decision.allowed {
        tracing::debug!(client_ip = %ip, retry_after = decision.retry_after_secs, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: decision.retry_after_secs,
            message: format!(
                "Too many requests. Try again in {} seconds",
                decision.retry_after_secs
            ),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: SocketAddr = "10.0.0.9:443".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "198.51.100.4:5000".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "198.51.100.4");
    }

    #[test]
    fn test_client_ip_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_ip(&headers, None), "unknown");
    }
}
