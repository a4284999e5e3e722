/// Card management endpoints
///
/// Dashboard CRUD over the caller's own cards. Every route below `/:id`
/// loads the card through `require_card_owner`, so a missing card is 404 and
/// someone else's card is 403.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use eprofile_shared::{
    auth::{authorization::require_card_owner, session::AuthContext},
    models::card::{is_valid_username, Card, CreateCard, UpdateCard},
    plans::{LimitEnforcer, LimitedResource},
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

const USERNAME_RULE: &str = "Username must be 3-30 characters of a-z, 0-9 or '-'";

/// Distinguishes an absent field from an explicit `null`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCardRequest {
    pub username: String,

    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: String,

    #[validate(length(max = 100))]
    pub job_title: Option<String>,

    #[validate(length(max = 100))]
    pub company: Option<String>,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    #[validate(url(message = "Invalid URL"))]
    pub website: Option<String>,

    #[validate(length(max = 100))]
    pub location: Option<String>,

    #[validate(url(message = "Invalid URL"))]
    pub avatar_url: Option<String>,

    #[validate(length(min = 1, max = 30))]
    pub theme: Option<String>,

    pub is_public: Option<bool>,
}

/// Partial update; `null` clears a nullable field
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCardRequest {
    pub username: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub job_title: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub company: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 30))]
    pub phone: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(url(message = "Invalid URL"))]
    pub website: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 100))]
    pub location: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[validate(url(message = "Invalid URL"))]
    pub avatar_url: Option<Option<String>>,

    #[validate(length(min = 1, max = 30))]
    pub theme: Option<String>,

    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    pub username: String,

    /// Card being edited, so its own username counts as available
    pub card_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    pub username: String,
    pub valid: bool,
    pub available: bool,
}

/// Lowercases and checks a requested username
fn normalize_username(raw: &str) -> ApiResult<String> {
    let username = raw.trim().to_lowercase();
    if !is_valid_username(&username) {
        return Err(ApiError::invalid_field("username", USERNAME_RULE));
    }
    Ok(username)
}

/// Creates a card
///
/// # Errors
///
/// - `400`: invalid fields or username
/// - `403`: card limit of the effective plan reached
/// - `409`: username taken
pub async fn create_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let username = normalize_username(&req.username)?;

    let mut tx = state.db.begin().await?;
    LimitEnforcer::enforce(&mut tx, auth.user_id, LimitedResource::Cards).await?;

    let card = Card::create(
        &mut *tx,
        CreateCard {
            user_id: auth.user_id,
            username,
            display_name: req.display_name.trim().to_string(),
            job_title: req.job_title,
            company: req.company,
            bio: req.bio,
            email: req.email,
            phone: req.phone,
            website: req.website,
            location: req.location,
            avatar_url: req.avatar_url,
            theme: req.theme,
            is_public: req.is_public,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, card_id = %card.id, username = %card.username, "Card created");

    Ok((StatusCode::CREATED, Json(card)))
}

/// Lists the caller's cards
pub async fn list_cards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Card>>> {
    let cards = Card::list_by_user(&state.db, auth.user_id).await?;
    Ok(Json(cards))
}

/// Checks whether a username can be claimed
pub async fn username_available(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> ApiResult<Json<UsernameAvailability>> {
    let username = query.username.trim().to_lowercase();

    if !is_valid_username(&username) {
        return Ok(Json(UsernameAvailability {
            username,
            valid: false,
            available: false,
        }));
    }

    let available = Card::username_available(&state.db, &username, query.card_id).await?;

    Ok(Json(UsernameAvailability {
        username,
        valid: true,
        available,
    }))
}

pub async fn get_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Card>> {
    let card = require_card_owner(&state.db, id, auth.user_id).await?;
    Ok(Json(card))
}

/// Applies a partial update to a card
pub async fn update_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateCardRequest>,
) -> ApiResult<Json<Card>> {
    require_card_owner(&state.db, id, auth.user_id).await?;

    let username = req
        .username
        .as_deref()
        .map(normalize_username)
        .transpose()?;

    let update = UpdateCard {
        username,
        display_name: req.display_name.map(|n| n.trim().to_string()),
        job_title: req.job_title,
        company: req.company,
        bio: req.bio,
        email: req.email,
        phone: req.phone,
        website: req.website,
        location: req.location,
        avatar_url: req.avatar_url,
        theme: req.theme,
        is_public: req.is_public,
    };

    let card = Card::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

    Ok(Json(card))
}

/// Deletes a card together with its sections, leads and analytics
pub async fn delete_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_card_owner(&state.db, id, auth.user_id).await?;

    if !Card::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Card not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, card_id = %id, "Card deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username(" Asha-Rao ").unwrap(), "asha-rao");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("asha_rao").is_err());
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let req: UpdateCardRequest =
            serde_json::from_value(json!({ "bio": null, "company": "Acme" })).unwrap();

        assert_eq!(req.bio, Some(None));
        assert_eq!(req.company, Some(Some("Acme".to_string())));
        assert_eq!(req.job_title, None);
    }

    #[test]
    fn test_create_request_validation() {
        let req: CreateCardRequest = serde_json::from_value(json!({
            "username": "asha-rao",
            "display_name": "",
            "website": "not a url"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("display_name"));
        assert!(fields.contains_key("website"));
    }
}
