/// Authentication endpoints
///
/// Email/password accounts with a server-issued session. Register, login and
/// refresh return a token pair and also set the `eprofile_session` cookie to
/// the access token, so browsers and API clients use the same endpoints.
///
/// # Endpoints
///
/// - `POST /v1/auth/register`
/// - `POST /v1/auth/login`
/// - `POST /v1/auth/refresh`
/// - `POST /v1/auth/logout`
/// - `GET /v1/auth/me`, `PATCH /v1/auth/me`
/// - `PUT /v1/auth/password`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use eprofile_shared::{
    auth::{
        jwt::{self, TokenPair},
        password,
        session::{self, AuthContext},
    },
    models::user::{CreateUser, User},
    plans::Plan,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Strength is checked separately against the password policy
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,
}

/// Public view of an account
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,

    /// Plan last paid for
    pub plan: Plan,

    /// Plan in force right now
    pub effective_plan: Plan,

    pub plan_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn from_user(user: User, now: DateTime<Utc>) -> Self {
        Self {
            effective_plan: user.effective_plan(now),
            id: user.id,
            email: user.email,
            name: user.name,
            plan: user.plan,
            plan_expires_at: user.plan_expires_at,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loads the authenticated user, 401 if the account has been deleted
pub(crate) async fn current_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account not found".to_string()))
}

fn with_session(state: &AppState, jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    jar.add(session::session_cookie(
        tokens.access_token.clone(),
        state.secure_cookies(),
    ))
}

/// Creates an account on the FREE plan
///
/// # Errors
///
/// - `400`: invalid email or weak password
/// - `409`: email already registered
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    password::check_strength(&req.password)?;
    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: normalize_email(&req.email),
            password_hash,
            name: req.name.map(|n| n.trim().to_string()),
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        with_session(&state, jar, &tokens),
        Json(SessionResponse {
            user: UserProfile::from_user(user, Utc::now()),
            tokens,
        }),
    ))
}

/// Exchanges email and password for a session
///
/// Unknown email and wrong password give the same 401.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;
    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        with_session(&state, jar, &tokens),
        Json(SessionResponse {
            user: UserProfile::from_user(user, Utc::now()),
            tokens,
        }),
    ))
}

/// Rotates the token pair using a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user_id, tokens) = jwt::refresh_token_pair(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account not found".to_string()))?;

    Ok((
        with_session(&state, jar, &tokens),
        Json(SessionResponse {
            user: UserProfile::from_user(user, Utc::now()),
            tokens,
        }),
    ))
}

/// Clears the session cookie
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        jar.add(session::clear_session_cookie(state.secure_cookies())),
    )
}

/// Current account with its effective plan
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserProfile>> {
    let user = current_user(&state, &auth).await?;
    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// Updates the display name
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<UpdateMeRequest>,
) -> ApiResult<Json<UserProfile>> {
    let user = User::update_profile(&state.db, auth.user_id, req.name.map(|n| n.trim().to_string()))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account not found".to_string()))?;

    Ok(Json(UserProfile::from_user(user, Utc::now())))
}

/// Changes the password after re-checking the current one
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let user = current_user(&state, &auth).await?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::invalid_field(
            "current_password",
            "Current password is incorrect",
        ));
    }

    password::check_strength(&req.new_password).map_err(|e| match ApiError::from(e) {
        ApiError::ValidationError(mut details) => {
            for detail in &mut details {
                detail.field = "new_password".to_string();
            }
            ApiError::ValidationError(details)
        }
        other => other,
    })?;

    let password_hash = password::hash_password(&req.new_password)?;
    User::update_password(&state.db, user.id, &password_hash).await?;

    tracing::info!(user_id = %user.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}
