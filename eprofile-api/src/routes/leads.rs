/// Lead inbox endpoints
///
/// Leads arrive through the public contact form and are read here by the
/// card owner. Access to a single lead is decided by the card it belongs to.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    pagination::{PageParams, Paginated},
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use eprofile_shared::{
    auth::{authorization::require_card_owner, session::AuthContext},
    models::lead::{Lead, LeadFilter, LeadStatus},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const STATUS_RULE: &str = "Status must be one of new, contacted, converted, archived";

/// `GET /v1/leads` query string
#[derive(Debug, Default, Deserialize)]
pub struct ListLeadsQuery {
    pub card_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLeadRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

fn parse_status(raw: &str) -> ApiResult<LeadStatus> {
    LeadStatus::parse(&raw.trim().to_lowercase())
        .ok_or_else(|| ApiError::invalid_field("status", STATUS_RULE))
}

/// Loads a lead and checks that the caller owns its card
async fn owned_lead(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Lead> {
    let lead = Lead::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    require_card_owner(&state.db, lead.card_id, auth.user_id).await?;
    Ok(lead)
}

/// Lists leads across the caller's cards, newest first
pub async fn list_leads(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListLeadsQuery>,
) -> ApiResult<Json<Paginated<Lead>>> {
    let page = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve()?;

    if let Some(card_id) = query.card_id {
        require_card_owner(&state.db, card_id, auth.user_id).await?;
    }

    let filter = LeadFilter {
        card_id: query.card_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };

    let items = Lead::list_for_user(&state.db, auth.user_id, &filter, page.limit(), page.offset()).await?;
    let total = Lead::count_for_user(&state.db, auth.user_id, &filter).await?;

    Ok(Json(Paginated::new(items, page, total)))
}

pub async fn get_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Lead>> {
    Ok(Json(owned_lead(&state, &auth, id).await?))
}

/// Moves a lead to another status
pub async fn update_lead_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateLeadRequest>,
) -> ApiResult<Json<Lead>> {
    let status = parse_status(&req.status)?;
    owned_lead(&state, &auth, id).await?;

    let lead = Lead::update_status(&state.db, id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lead not found".to_string()))?;

    tracing::debug!(lead_id = %id, status = status.as_str(), "Lead status changed");
    Ok(Json(lead))
}

pub async fn delete_lead(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    owned_lead(&state, &auth, id).await?;

    if !Lead::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Lead not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("Contacted").unwrap(), LeadStatus::Contacted);
        assert_eq!(parse_status(" archived ").unwrap(), LeadStatus::Archived);

        match parse_status("spam") {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "status"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
