/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use eprofile_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config, None));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use eprofile_shared::auth::session;
use eprofile_shared::redis::{RateLimiter, RedisClient};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Present when `REDIS_URL` is configured
    pub redis: Option<RedisClient>,

    /// Public endpoint limiter, built on `redis`
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, redis: Option<RedisClient>) -> Self {
        let rate_limiter = redis
            .clone()
            .map(|client| RateLimiter::new(client, config.redis.public_rate_limit_per_minute));

        Self {
            db,
            config: Arc::new(config),
            redis,
            rate_limiter,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Session cookies carry the Secure flag in production
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the router with all routes and middleware
///
/// ```text
/// /health
/// /v1/auth/{register,login,refresh,logout}        public
/// /v1/auth/{me,password}                          session
/// /v1/cards[/:id[/<section>[/:item_id|/order]]]   session
/// /v1/cards/:id/analytics, /v1/analytics/overview session
/// /v1/leads[/:id]                                 session
/// /v1/subscription[/events]                       session
/// /v1/payments[/orders|/verify|/summary|/:id/invoice] session
/// /v1/payments/webhook                            gateway signature
/// /v1/public/cards/:username[/leads|/clicks]      public, rate limited
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{analytics, auth, cards, health, leads, payments, public, sections, subscription};

    let public_auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/payments/webhook", post(payments::webhook));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me).patch(auth::update_me))
        .route("/auth/password", put(auth::change_password))
        .route("/cards", post(cards::create_card).get(cards::list_cards))
        .route("/cards/username-available", get(cards::username_available))
        .route(
            "/cards/:id",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/cards/:id/analytics", get(analytics::card_analytics))
        .merge(sections::routes())
        .route("/analytics/overview", get(analytics::overview))
        .route("/leads", get(leads::list_leads))
        .route(
            "/leads/:id",
            get(leads::get_lead)
                .patch(leads::update_lead_status)
                .delete(leads::delete_lead),
        )
        .route("/subscription", get(subscription::get_subscription))
        .route("/subscription/events", get(subscription::list_events))
        .route("/payments", get(payments::list_payments))
        .route("/payments/orders", post(payments::create_order))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/payments/summary", get(payments::payment_summary))
        .route("/payments/:id/invoice", get(payments::get_invoice))
        .layer(from_fn_with_state(state.clone(), session_auth_layer));

    let public_routes = Router::new()
        .route("/public/cards/:username", get(public::get_public_card))
        .route("/public/cards/:username/leads", post(public::submit_lead))
        .route("/public/cards/:username/clicks", post(public::record_click))
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::public_rate_limit,
        ));

    let v1_routes = Router::new()
        .merge(public_auth_routes)
        .merge(protected_routes)
        .merge(public_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Session authentication
///
/// Reads the session cookie or Bearer token and stores the resulting
/// `AuthContext` in the request extensions.
async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = session::authenticate(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
