/// Session lookup for authenticated requests
///
/// The browser dashboard carries the access token in the `eprofile_session`
/// cookie. Scripts and mobile clients send it as `Authorization: Bearer`.
/// The cookie wins when both are present.
///
/// After successful authentication the API layer inserts an [`AuthContext`]
/// into the request extensions, and handlers pull it out with
/// `Extension<AuthContext>`.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use eprofile_shared::auth::session::authenticate;
///
/// # fn example(headers: &HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let auth = authenticate(headers, "jwt-secret-at-least-32-bytes-long!!")?;
/// println!("request from {}", auth.user_id);
/// # Ok(())
/// # }
/// ```

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError, TokenType};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "eprofile_session";

/// Where the credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Cookie,
    Bearer,
}

/// Authenticated user for the current request
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub method: AuthMethod,
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Neither cookie nor Authorization header present
    #[error("Authentication required")]
    MissingCredentials,

    /// Authorization header is not `Bearer <token>`
    #[error("Authorization header must use the Bearer scheme")]
    InvalidScheme,

    /// Token failed validation
    #[error(transparent)]
    InvalidToken(#[from] JwtError),
}

/// Finds the session credential in request headers
///
/// Empty cookie values are ignored so a cleared cookie falls through to the
/// Authorization header.
pub fn extract_credential(headers: &HeaderMap) -> Result<(String, AuthMethod), AuthError> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Ok((cookie.value().to_string(), AuthMethod::Cookie));
        }
    }

    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidScheme)?;

    Ok((token.to_string(), AuthMethod::Bearer))
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// Returns `AuthError` when no credential is present or the access token is
/// invalid, expired, or a refresh token.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let (token, method) = extract_credential(headers)?;
    let claims = validate_access_token(&token, secret)?;

    Ok(AuthContext {
        user_id: claims.sub,
        method,
    })
}

/// Builds the session cookie holding an access token
pub fn session_cookie(access_token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, access_token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(cookie_max_age(TokenType::Access.lifetime()))
        .build()
}

/// Builds an expired session cookie that makes the browser drop the session
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

fn cookie_max_age(lifetime: chrono::Duration) -> time::Duration {
    time::Duration::seconds(lifetime.num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::issue_token_pair;
    use axum::http::HeaderValue;

    const SECRET: &str = "session-test-secret-with-enough-bytes!";

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_missing_credentials() {
        assert!(matches!(
            authenticate(&HeaderMap::new(), SECRET),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_bearer_token() {
        let user_id = Uuid::new_v4();
        let pair = issue_token_pair(user_id, SECRET).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", pair.access_token));

        let auth = authenticate(&headers, SECRET).unwrap();
        assert_eq!(auth.user_id, user_id);
        assert_eq!(auth.method, AuthMethod::Bearer);
    }

    #[test]
    fn test_cookie_preferred_over_bearer() {
        let cookie_user = Uuid::new_v4();
        let bearer_user = Uuid::new_v4();
        let cookie_pair = issue_token_pair(cookie_user, SECRET).unwrap();
        let bearer_pair = issue_token_pair(bearer_user, SECRET).unwrap();

        let mut headers = headers_with(
            header::COOKIE,
            &format!("theme=dark; {}={}", SESSION_COOKIE, cookie_pair.access_token),
        );
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer_pair.access_token)).unwrap(),
        );

        let auth = authenticate(&headers, SECRET).unwrap();
        assert_eq!(auth.user_id, cookie_user);
        assert_eq!(auth.method, AuthMethod::Cookie);
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let headers = headers_with(header::AUTHORIZATION, "Basic dXNlcjpwYXNz");
        assert!(matches!(
            authenticate(&headers, SECRET),
            Err(AuthError::InvalidScheme)
        ));
    }

    #[test]
    fn test_refresh_token_rejected_as_session() {
        let pair = issue_token_pair(Uuid::new_v4(), SECRET).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", pair.refresh_token));

        assert!(matches!(
            authenticate(&headers, SECRET),
            Err(AuthError::InvalidToken(JwtError::WrongType { .. }))
        ));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));

        let cleared = clear_session_cookie(false);
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.secure(), Some(false));
    }
}
