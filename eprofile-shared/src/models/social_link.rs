/// Social profile links shown on a card
///
/// # Schema
///
/// ```sql
/// CREATE TABLE social_links (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     card_id UUID NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
///     platform VARCHAR(50) NOT NULL,
///     url VARCHAR(512) NOT NULL,
///     position INTEGER NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::social_link::{SocialLink, SocialLinkInput};
/// use sqlx::{PgExecutor, PgPool};
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, card_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let first = SocialLink::create(&pool, card_id, SocialLinkInput {
///     platform: "linkedin".to_string(),
///     url: "https://linkedin.com/in/asha".to_string(),
/// }).await?;
/// assert_eq!(first.position, 0);
///
/// // Move it to the end
/// let second = SocialLink::create(&pool, card_id, SocialLinkInput {
///     platform: "github".to_string(),
///     url: "https://github.com/asha".to_string(),
/// }).await?;
/// SocialLink::reorder(&pool, card_id, &[second.id, first.id]).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::ordering::{self, ReorderError, Section};

/// Social link
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SocialLink {
    pub id: Uuid,
    pub card_id: Uuid,

    /// Free-form platform key, e.g. `linkedin`, `instagram`, `whatsapp`
    pub platform: String,

    pub url: String,

    /// Zero-based position inside the card
    pub position: i32,

    pub created_at: DateTime<Utc>,
}

/// Fields supplied on create and replace
#[derive(Debug, Clone)]
pub struct SocialLinkInput {
    pub platform: String,
    pub url: String,
}

impl SocialLink {
    /// Appends a link after the card's last one
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `card_id` - Owning card (ownership is checked by the caller)
    /// * `data` - Link fields
    pub async fn create<'e, E>(
        executor: E,
        card_id: Uuid,
        data: SocialLinkInput,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SocialLink>(
            r#"
            INSERT INTO social_links (card_id, platform, url, position)
            VALUES ($1, $2, $3,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM social_links WHERE card_id = $1))
            RETURNING id, card_id, platform, url, position, created_at
            "#,
        )
        .bind(card_id)
        .bind(data.platform)
        .bind(data.url)
        .fetch_one(executor)
        .await
    }

    /// Lists a card's links in display order
    pub async fn list_by_card(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SocialLink>(
            r#"
            SELECT id, card_id, platform, url, position, created_at
            FROM social_links
            WHERE card_id = $1
            ORDER BY position, created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    /// Finds a link inside a card
    ///
    /// Returns None when the id exists but belongs to a different card.
    pub async fn find_by_id(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SocialLink>(
            r#"
            SELECT id, card_id, platform, url, position, created_at
            FROM social_links
            WHERE id = $1 AND card_id = $2
            "#,
        )
        .bind(id)
        .bind(card_id)
        .fetch_optional(pool)
        .await
    }

    /// Replaces a link's fields, keeping its position
    pub async fn update(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        data: SocialLinkInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SocialLink>(
            r#"
            UPDATE social_links
            SET platform = $3, url = $4
            WHERE id = $1 AND card_id = $2
            RETURNING id, card_id, platform, url, position, created_at
            "#,
        )
        .bind(id)
        .bind(card_id)
        .bind(data.platform)
        .bind(data.url)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a link and closes the gap it leaves
    pub async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        ordering::delete_and_compact(pool, Section::SocialLinks, card_id, id).await
    }

    /// Counts a card's links
    pub async fn count_by_card(pool: &PgPool, card_id: Uuid) -> Result<i64, sqlx::Error> {
        ordering::count(pool, Section::SocialLinks, card_id).await
    }

    /// Puts the card's links in the order given by `ids`
    pub async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        ordering::reorder(pool, Section::SocialLinks, card_id, ids).await
    }
}
