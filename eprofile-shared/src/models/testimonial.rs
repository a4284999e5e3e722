/// Client testimonials on a card
///
/// Ratings are optional and constrained to 1-5 by the table.
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::testimonial::{Testimonial, TestimonialInput};
/// use sqlx::{PgExecutor, PgPool};
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, card_id: Uuid) -> Result<(), sqlx::Error> {
/// Testimonial::create(&pool, card_id, TestimonialInput {
///     author_name: "Ravi K".to_string(),
///     author_title: Some("CTO, Acme".to_string()),
///     content: "Delivered ahead of schedule.".to_string(),
///     rating: Some(5),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::ordering::{self, ReorderError, Section};

/// Testimonial
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Testimonial {
    pub id: Uuid,
    pub card_id: Uuid,
    pub author_name: String,
    pub author_title: Option<String>,
    pub content: String,

    /// 1-5 stars
    pub rating: Option<i16>,

    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied on create and replace
#[derive(Debug, Clone)]
pub struct TestimonialInput {
    pub author_name: String,
    pub author_title: Option<String>,
    pub content: String,
    pub rating: Option<i16>,
}

impl Testimonial {
    /// Appends a testimonial after the card's last one
    pub async fn create<'e, E>(
        executor: E,
        card_id: Uuid,
        data: TestimonialInput,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Testimonial>(
            r#"
            INSERT INTO testimonials (card_id, author_name, author_title, content, rating, position)
            VALUES ($1, $2, $3, $4, $5,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM testimonials WHERE card_id = $1))
            RETURNING id, card_id, author_name, author_title, content, rating, position, created_at
            "#,
        )
        .bind(card_id)
        .bind(data.author_name)
        .bind(data.author_title)
        .bind(data.content)
        .bind(data.rating)
        .fetch_one(executor)
        .await
    }

    /// Lists a card's testimonials in display order
    pub async fn list_by_card(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(
            r#"
            SELECT id, card_id, author_name, author_title, content, rating, position, created_at
            FROM testimonials
            WHERE card_id = $1
            ORDER BY position, created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    /// Finds a testimonial inside a card
    pub async fn find_by_id(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(
            r#"
            SELECT id, card_id, author_name, author_title, content, rating, position, created_at
            FROM testimonials
            WHERE id = $1 AND card_id = $2
            "#,
        )
        .bind(id)
        .bind(card_id)
        .fetch_optional(pool)
        .await
    }

    /// Replaces a testimonial's fields, keeping its position
    pub async fn update(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        data: TestimonialInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Testimonial>(
            r#"
            UPDATE testimonials
            SET author_name = $3, author_title = $4, content = $5, rating = $6
            WHERE id = $1 AND card_id = $2
            RETURNING id, card_id, author_name, author_title, content, rating, position, created_at
            "#,
        )
        .bind(id)
        .bind(card_id)
        .bind(data.author_name)
        .bind(data.author_title)
        .bind(data.content)
        .bind(data.rating)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a testimonial and compacts positions
    pub async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        ordering::delete_and_compact(pool, Section::Testimonials, card_id, id).await
    }

    /// Counts a card's testimonials
    pub async fn count_by_card(pool: &PgPool, card_id: Uuid) -> Result<i64, sqlx::Error> {
        ordering::count(pool, Section::Testimonials, card_id).await
    }

    /// Puts the card's testimonials in the order given by `ids`
    pub async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        ordering::reorder(pool, Section::Testimonials, card_id, ids).await
    }
}
