/// Public card endpoints
///
/// Unauthenticated and rate limited per client IP. Hidden cards behave
/// exactly like missing ones. View and click events are written on a spawned
/// task; a failed write is logged and never changes the response.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use eprofile_shared::models::{
    analytics::Analytics,
    card::Card,
    gallery_item::GalleryItem,
    lead::{CreateLead, Lead, LeadStatus},
    service::Service,
    social_link::SocialLink,
    testimonial::Testimonial,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const MAX_HEADER_LEN: usize = 512;

/// Card as shown to visitors
#[derive(Debug, Serialize)]
pub struct PublicCard {
    pub username: String,
    pub display_name: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: String,
    pub updated_at: DateTime<Utc>,
}

impl From<Card> for PublicCard {
    fn from(card: Card) -> Self {
        Self {
            username: card.username,
            display_name: card.display_name,
            job_title: card.job_title,
            company: card.company,
            bio: card.bio,
            email: card.email,
            phone: card.phone,
            website: card.website,
            location: card.location,
            avatar_url: card.avatar_url,
            theme: card.theme,
            updated_at: card.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublicCardResponse {
    pub card: PublicCard,
    pub social_links: Vec<SocialLink>,
    pub services: Vec<Service>,
    pub gallery: Vec<GalleryItem>,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "require_contact"))]
pub struct SubmitLeadRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 5, max = 30, message = "Phone must be 5-30 characters"))]
    pub phone: Option<String>,

    #[validate(length(max = 2000, message = "Message must be at most 2000 characters"))]
    pub message: Option<String>,
}

/// A lead must leave some way to reach them
fn require_contact(req: &SubmitLeadRequest) -> Result<(), ValidationError> {
    let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if has(&req.email) || has(&req.phone) {
        return Ok(());
    }

    let mut err = ValidationError::new("contact_required");
    err.message = Some("Either email or phone is required".into());
    Err(err)
}

#[derive(Debug, Serialize)]
pub struct LeadReceipt {
    pub id: Uuid,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordClickRequest {
    /// Button key, e.g. `call`, `whatsapp`, `save_contact`
    #[validate(length(min = 1, max = 50, message = "Button must be 1-50 characters"))]
    pub button: String,
}

/// Loads a card visitors are allowed to see
async fn visible_card(state: &AppState, username: &str) -> ApiResult<Card> {
    Card::find_by_username(&state.db, &username.to_lowercase())
        .await?
        .filter(|card| card.is_public)
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))
}

/// Header value as a bounded string, None when absent or blank
fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        return None;
    }

    let mut end = value.len().min(MAX_HEADER_LEN);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    Some(value[..end].to_string())
}

/// Renders a public card with its ordered sections
pub async fn get_public_card(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<PublicCardResponse>> {
    let card = visible_card(&state, &username).await?;

    let social_links = SocialLink::list_by_card(&state.db, card.id).await?;
    let services = Service::list_by_card(&state.db, card.id).await?;
    let gallery = GalleryItem::list_by_card(&state.db, card.id).await?;
    let testimonials = Testimonial::list_by_card(&state.db, card.id).await?;

    let db = state.db.clone();
    let card_id = card.id;
    let referrer = header_text(&headers, header::REFERER);
    let user_agent = header_text(&headers, header::USER_AGENT);
    tokio::spawn(async move {
        if let Err(e) =
            Analytics::record_view(&db, card_id, referrer.as_deref(), user_agent.as_deref()).await
        {
            tracing::warn!(card_id = %card_id, error = %e, "Failed to record card view");
        }
    });

    Ok(Json(PublicCardResponse {
        card: card.into(),
        social_links,
        services,
        gallery,
        testimonials,
    }))
}

/// Contact form submission
pub async fn submit_lead(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<SubmitLeadRequest>,
) -> ApiResult<(StatusCode, Json<LeadReceipt>)> {
    let card = visible_card(&state, &username).await?;
    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let lead = Lead::create(
        &state.db,
        CreateLead {
            card_id: card.id,
            name: req.name.trim().to_string(),
            email: non_blank(req.email),
            phone: non_blank(req.phone),
            message: non_blank(req.message),
        },
    )
    .await?;

    tracing::info!(card_id = %card.id, lead_id = %lead.id, "Lead received");

    Ok((
        StatusCode::CREATED,
        Json(LeadReceipt {
            id: lead.id,
            status: lead.status,
            created_at: lead.created_at,
        }),
    ))
}

/// Records a button click; the write happens after the response
pub async fn record_click(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ValidatedJson(req): ValidatedJson<RecordClickRequest>,
) -> ApiResult<StatusCode> {
    let card = visible_card(&state, &username).await?;
    let button = req.button.trim().to_lowercase();

    let db = state.db.clone();
    tokio::spawn(async move {
        if let Err(e) = Analytics::record_click(&db, card.id, &button).await {
            tracing::warn!(card_id = %card.id, button = %button, error = %e, "Failed to record click");
        }
    });

    Ok(StatusCode::ACCEPTED)
}
