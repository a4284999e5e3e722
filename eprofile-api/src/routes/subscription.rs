/// Subscription endpoints
///
/// Shows the stored plan next to the effective one; they differ when a paid
/// plan has lapsed but the expiry sweep has not run yet.

use crate::{app::AppState, error::ApiResult, routes::auth::current_user};
use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use eprofile_shared::{
    auth::session::AuthContext,
    models::{
        card::Card, gallery_item::GalleryItem, service::Service, social_link::SocialLink,
        subscription_event::SubscriptionEvent, testimonial::Testimonial,
    },
    plans::{Plan, PlanLimits},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_EVENTS: i64 = 50;
const MAX_EVENTS: i64 = 200;

/// Per-card section counts
#[derive(Debug, Serialize)]
pub struct CardUsage {
    pub card_id: Uuid,
    pub username: String,
    pub social_links: i64,
    pub services: i64,
    pub gallery_items: i64,
    pub testimonials: i64,
}

#[derive(Debug, Serialize)]
pub struct Usage {
    pub cards: i64,
    pub per_card: Vec<CardUsage>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub plan: Plan,
    pub effective_plan: Plan,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_remaining: i64,
    pub limits: PlanLimits,
    pub usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let now = Utc::now();
    let user = current_user(&state, &auth).await?;
    let effective_plan = user.effective_plan(now);

    let cards = Card::list_by_user(&state.db, user.id).await?;
    let mut per_card = Vec::with_capacity(cards.len());
    for card in &cards {
        per_card.push(CardUsage {
            card_id: card.id,
            username: card.username.clone(),
            social_links: SocialLink::count_by_card(&state.db, card.id).await?,
            services: Service::count_by_card(&state.db, card.id).await?,
            gallery_items: GalleryItem::count_by_card(&state.db, card.id).await?,
            testimonials: Testimonial::count_by_card(&state.db, card.id).await?,
        });
    }

    Ok(Json(SubscriptionResponse {
        plan: user.plan,
        effective_plan,
        expires_at: user.plan_expires_at.filter(|_| effective_plan.is_paid()),
        days_remaining: user.days_remaining(now),
        limits: PlanLimits::for_plan(effective_plan),
        usage: Usage {
            cards: cards.len() as i64,
            per_card,
        },
    }))
}

/// Plan transitions, newest first
pub async fn list_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<Vec<SubscriptionEvent>>> {
    let limit = query.limit.unwrap_or(DEFAULT_EVENTS).clamp(1, MAX_EVENTS);
    let events = SubscriptionEvent::list_by_user(&state.db, auth.user_id, limit).await?;
    Ok(Json(events))
}
