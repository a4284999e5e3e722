/// Card section endpoints
///
/// Social links, services, gallery items and testimonials share one set of
/// handlers, parameterised by [`SectionKind`]. Each kind is mounted at
/// `/cards/:id/<path>` with:
///
/// - `GET` / `POST` on the collection
/// - `PUT /order` with `{ "ids": [...] }` listing every item exactly once
/// - `PUT` / `DELETE` on `/:item_id`; PUT replaces all fields
///
/// Creating an item is capped per card by the owner's effective plan.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
};
use axum::{
    async_trait,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use eprofile_shared::{
    auth::{authorization::require_card_owner, session::AuthContext},
    models::{
        gallery_item::{GalleryItem, GalleryItemInput},
        ordering::ReorderError,
        service::{Service, ServiceInput},
        social_link::{SocialLink, SocialLinkInput},
        testimonial::{Testimonial, TestimonialInput},
    },
    plans::{LimitEnforcer, LimitedResource},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

/// One kind of ordered card section
#[async_trait]
pub trait SectionKind: Send + Sync + 'static {
    type Item: Serialize + Send + 'static;
    type Request: DeserializeOwned + Validate + Send + 'static;

    /// Plan limit this section counts against
    const RESOURCE: LimitedResource;

    /// Singular name used in error messages
    const NAME: &'static str;

    async fn list(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self::Item>, sqlx::Error>;

    /// Inserts on the caller's transaction
    async fn create(
        conn: &mut PgConnection,
        card_id: Uuid,
        req: Self::Request,
    ) -> Result<Self::Item, sqlx::Error>;

    async fn replace(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        req: Self::Request,
    ) -> Result<Option<Self::Item>, sqlx::Error>;

    async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError>;
}

#[derive(Debug, Deserialize, Validate)]
pub struct SocialLinkRequest {
    #[validate(length(min = 1, max = 50, message = "Platform must be 1-50 characters"))]
    pub platform: String,

    #[validate(url(message = "Invalid URL"))]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ServiceRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    /// Display text, e.g. "from ₹2,000"
    #[validate(length(max = 50))]
    pub price: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GalleryItemRequest {
    #[validate(url(message = "Invalid URL"))]
    pub image_url: String,

    #[validate(length(max = 200))]
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TestimonialRequest {
    #[validate(length(min = 1, max = 100, message = "Author name must be 1-100 characters"))]
    pub author_name: String,

    #[validate(length(max = 100))]
    pub author_title: Option<String>,

    #[validate(length(min = 1, max = 2000, message = "Content must be 1-2000 characters"))]
    pub content: String,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

pub struct SocialLinks;
pub struct Services;
pub struct Gallery;
pub struct Testimonials;

#[async_trait]
impl SectionKind for SocialLinks {
    type Item = SocialLink;
    type Request = SocialLinkRequest;

    const RESOURCE: LimitedResource = LimitedResource::SocialLinks;
    const NAME: &'static str = "Social link";

    async fn list(pool: &PgPool, card_id: Uuid) -> Result<Vec<SocialLink>, sqlx::Error> {
        SocialLink::list_by_card(pool, card_id).await
    }

    async fn create(conn: &mut PgConnection, card_id: Uuid, req: SocialLinkRequest) -> Result<SocialLink, sqlx::Error> {
        SocialLink::create(conn, card_id, req.into()).await
    }

    async fn replace(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        req: SocialLinkRequest,
    ) -> Result<Option<SocialLink>, sqlx::Error> {
        SocialLink::update(pool, card_id, id, req.into()).await
    }

    async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        SocialLink::delete(pool, card_id, id).await
    }

    async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        SocialLink::reorder(pool, card_id, ids).await
    }
}

#[async_trait]
impl SectionKind for Services {
    type Item = Service;
    type Request = ServiceRequest;

    const RESOURCE: LimitedResource = LimitedResource::Services;
    const NAME: &'static str = "Service";

    async fn list(pool: &PgPool, card_id: Uuid) -> Result<Vec<Service>, sqlx::Error> {
        Service::list_by_card(pool, card_id).await
    }

    async fn create(conn: &mut PgConnection, card_id: Uuid, req: ServiceRequest) -> Result<Service, sqlx::Error> {
        Service::create(conn, card_id, req.into()).await
    }

    async fn replace(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        req: ServiceRequest,
    ) -> Result<Option<Service>, sqlx::Error> {
        Service::update(pool, card_id, id, req.into()).await
    }

    async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        Service::delete(pool, card_id, id).await
    }

    async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        Service::reorder(pool, card_id, ids).await
    }
}

#[async_trait]
impl SectionKind for Gallery {
    type Item = GalleryItem;
    type Request = GalleryItemRequest;

    const RESOURCE: LimitedResource = LimitedResource::GalleryItems;
    const NAME: &'static str = "Gallery item";

    async fn list(pool: &PgPool, card_id: Uuid) -> Result<Vec<GalleryItem>, sqlx::Error> {
        GalleryItem::list_by_card(pool, card_id).await
    }

    async fn create(conn: &mut PgConnection, card_id: Uuid, req: GalleryItemRequest) -> Result<GalleryItem, sqlx::Error> {
        GalleryItem::create(conn, card_id, req.into()).await
    }

    async fn replace(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        req: GalleryItemRequest,
    ) -> Result<Option<GalleryItem>, sqlx::Error> {
        GalleryItem::update(pool, card_id, id, req.into()).await
    }

    async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        GalleryItem::delete(pool, card_id, id).await
    }

    async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        GalleryItem::reorder(pool, card_id, ids).await
    }
}

#[async_trait]
impl SectionKind for Testimonials {
    type Item = Testimonial;
    type Request = TestimonialRequest;

    const RESOURCE: LimitedResource = LimitedResource::Testimonials;
    const NAME: &'static str = "Testimonial";

    async fn list(pool: &PgPool, card_id: Uuid) -> Result<Vec<Testimonial>, sqlx::Error> {
        Testimonial::list_by_card(pool, card_id).await
    }

    async fn create(conn: &mut PgConnection, card_id: Uuid, req: TestimonialRequest) -> Result<Testimonial, sqlx::Error> {
        Testimonial::create(conn, card_id, req.into()).await
    }

    async fn replace(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        req: TestimonialRequest,
    ) -> Result<Option<Testimonial>, sqlx::Error> {
        Testimonial::update(pool, card_id, id, req.into()).await
    }

    async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        Testimonial::delete(pool, card_id, id).await
    }

    async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        Testimonial::reorder(pool, card_id, ids).await
    }
}

impl From<SocialLinkRequest> for SocialLinkInput {
    fn from(req: SocialLinkRequest) -> Self {
        SocialLinkInput {
            platform: req.platform.trim().to_lowercase(),
            url: req.url,
        }
    }
}

impl From<ServiceRequest> for ServiceInput {
    fn from(req: ServiceRequest) -> Self {
        ServiceInput {
            title: req.title,
            description: req.description,
            price: req.price,
        }
    }
}

impl From<GalleryItemRequest> for GalleryItemInput {
    fn from(req: GalleryItemRequest) -> Self {
        GalleryItemInput {
            image_url: req.image_url,
            caption: req.caption,
        }
    }
}

impl From<TestimonialRequest> for TestimonialInput {
    fn from(req: TestimonialRequest) -> Self {
        TestimonialInput {
            author_name: req.author_name,
            author_title: req.author_title,
            content: req.content,
            rating: req.rating,
        }
    }
}

fn item_not_found<K: SectionKind>() -> ApiError {
    ApiError::NotFound(format!("{} not found", K::NAME))
}

async fn list_items<K: SectionKind>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
) -> ApiResult<Json<Vec<K::Item>>> {
    require_card_owner(&state.db, card_id, auth.user_id).await?;
    Ok(Json(K::list(&state.db, card_id).await?))
}

async fn create_item<K: SectionKind>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<K::Request>,
) -> ApiResult<(StatusCode, Json<K::Item>)> {
    require_card_owner(&state.db, card_id, auth.user_id).await?;

    let mut tx = state.db.begin().await?;
    LimitEnforcer::enforce_for_card(&mut tx, auth.user_id, card_id, K::RESOURCE).await?;

    let item = K::create(&mut tx, card_id, req).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item<K: SectionKind>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((card_id, item_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<K::Request>,
) -> ApiResult<Json<K::Item>> {
    require_card_owner(&state.db, card_id, auth.user_id).await?;

    K::replace(&state.db, card_id, item_id, req)
        .await?
        .map(Json)
        .ok_or_else(item_not_found::<K>)
}

async fn delete_item<K: SectionKind>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((card_id, item_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    require_card_owner(&state.db, card_id, auth.user_id).await?;

    if !K::delete(&state.db, card_id, item_id).await? {
        return Err(item_not_found::<K>());
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_items<K: SectionKind>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(card_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<ReorderRequest>,
) -> ApiResult<Json<Vec<K::Item>>> {
    require_card_owner(&state.db, card_id, auth.user_id).await?;

    K::reorder(&state.db, card_id, &req.ids).await?;
    tracing::debug!(card_id = %card_id, section = K::NAME, items = req.ids.len(), "Section reordered");

    Ok(Json(K::list(&state.db, card_id).await?))
}

fn section_routes<K: SectionKind>(path: &str) -> Router<AppState> {
    let collection = format!("/cards/:id/{path}");

    Router::new()
        .route(&collection, get(list_items::<K>).post(create_item::<K>))
        .route(&format!("{collection}/order"), put(reorder_items::<K>))
        .route(
            &format!("{collection}/:item_id"),
            put(update_item::<K>).delete(delete_item::<K>),
        )
}

/// Routes for every card section, relative to `/v1`
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(section_routes::<SocialLinks>("social-links"))
        .merge(section_routes::<Services>("services"))
        .merge(section_routes::<Gallery>("gallery"))
        .merge(section_routes::<Testimonials>("testimonials"))
}
