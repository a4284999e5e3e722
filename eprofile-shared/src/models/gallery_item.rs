/// Gallery images on a card
///
/// Only the image URL is stored; uploads go straight to object storage from
/// the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::ordering::{self, ReorderError, Section};

/// Gallery image
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GalleryItem {
    pub id: Uuid,
    pub card_id: Uuid,
    pub image_url: String,
    pub caption: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied on create and replace
#[derive(Debug, Clone)]
pub struct GalleryItemInput {
    pub image_url: String,
    pub caption: Option<String>,
}

impl GalleryItem {
    /// Appends an image after the card's last one
    pub async fn create<'e, E>(
        executor: E,
        card_id: Uuid,
        data: GalleryItemInput,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, GalleryItem>(
            r#"
            INSERT INTO gallery_items (card_id, image_url, caption, position)
            VALUES ($1, $2, $3,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM gallery_items WHERE card_id = $1))
            RETURNING id, card_id, image_url, caption, position, created_at
            "#,
        )
        .bind(card_id)
        .bind(data.image_url)
        .bind(data.caption)
        .fetch_one(executor)
        .await
    }

    /// Lists a card's images in display order
    pub async fn list_by_card(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GalleryItem>(
            r#"
            SELECT id, card_id, image_url, caption, position, created_at
            FROM gallery_items
            WHERE card_id = $1
            ORDER BY position, created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    /// Finds an image inside a card
    pub async fn find_by_id(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GalleryItem>(
            r#"
            SELECT id, card_id, image_url, caption, position, created_at
            FROM gallery_items
            WHERE id = $1 AND card_id = $2
            "#,
        )
        .bind(id)
        .bind(card_id)
        .fetch_optional(pool)
        .await
    }

    /// Replaces an image's URL and caption
    pub async fn update(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        data: GalleryItemInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GalleryItem>(
            r#"
            UPDATE gallery_items
            SET image_url = $3, caption = $4
            WHERE id = $1 AND card_id = $2
            RETURNING id, card_id, image_url, caption, position, created_at
            "#,
        )
        .bind(id)
        .bind(card_id)
        .bind(data.image_url)
        .bind(data.caption)
        .fetch_optional(pool)
        .await
    }

    /// Deletes an image and compacts positions
    pub async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        ordering::delete_and_compact(pool, Section::Gallery, card_id, id).await
    }

    pub async fn count_by_card(pool: &PgPool, card_id: Uuid) -> Result<i64, sqlx::Error> {
        ordering::count(pool, Section::Gallery, card_id).await
    }

    pub async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        ordering::reorder(pool, Section::Gallery, card_id, ids).await
    }
}
