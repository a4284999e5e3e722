/// HTTP middleware
///
/// - `security`: security response headers
/// - `rate_limit`: per-IP throttling of the public endpoints

pub mod rate_limit;
pub mod security;
