/// Analytics endpoints
///
/// `days` defaults to 7 and is clamped to `[1, plan window]`, where the
/// window comes from the caller's effective plan (7, 30 or 365 days).

use crate::{app::AppState, error::ApiResult, routes::auth::current_user};
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;
use eprofile_shared::{
    auth::{authorization::require_card_owner, session::AuthContext},
    models::analytics::{Analytics, AnalyticsScope, AnalyticsSummary},
    plans::PlanLimits,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<u32>,
}

async fn summary_for(
    state: &AppState,
    auth: &AuthContext,
    scope: AnalyticsScope,
    requested: Option<u32>,
) -> ApiResult<AnalyticsSummary> {
    let now = Utc::now();
    let user = current_user(state, auth).await?;
    let days = PlanLimits::for_plan(user.effective_plan(now)).clamp_analytics_days(requested);

    Ok(Analytics::summary(&state.db, scope, days, now).await?)
}

/// Views, clicks, referrers and leads for one card
pub async fn card_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsSummary>> {
    require_card_owner(&state.db, id, auth.user_id).await?;

    let summary = summary_for(&state, &auth, AnalyticsScope::Card(id), query.days).await?;
    Ok(Json(summary))
}

/// The same aggregation over all of the caller's cards
pub async fn overview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsSummary>> {
    let summary = summary_for(&state, &auth, AnalyticsScope::User(auth.user_id), query.days).await?;
    Ok(Json(summary))
}
