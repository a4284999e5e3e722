/// Services offered on a card (title, description, free-text price)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::ordering::{self, ReorderError, Section};

/// Service listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub card_id: Uuid,
    pub title: String,
    pub description: Option<String>,

    /// Display text such as "₹1,500 / session", not parsed
    pub price: Option<String>,

    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ServiceInput {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<String>,
}

impl Service {
    pub async fn create<'e, E>(
        executor: E,
        card_id: Uuid,
        data: ServiceInput,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (card_id, title, description, price, position)
            VALUES ($1, $2, $3, $4,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM services WHERE card_id = $1))
            RETURNING id, card_id, title, description, price, position, created_at
            "#,
        )
        .bind(card_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.price)
        .fetch_one(executor)
        .await
    }

    pub async fn list_by_card(pool: &PgPool, card_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT id, card_id, title, description, price, position, created_at
            FROM services
            WHERE card_id = $1
            ORDER BY position, created_at
            "#,
        )
        .bind(card_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            SELECT id, card_id, title, description, price, position, created_at
            FROM services
            WHERE id = $1 AND card_id = $2
            "#,
        )
        .bind(id)
        .bind(card_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        card_id: Uuid,
        id: Uuid,
        data: ServiceInput,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET title = $3, description = $4, price = $5
            WHERE id = $1 AND card_id = $2
            RETURNING id, card_id, title, description, price, position, created_at
            "#,
        )
        .bind(id)
        .bind(card_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.price)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, card_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        ordering::delete_and_compact(pool, Section::Services, card_id, id).await
    }

    pub async fn count_by_card(pool: &PgPool, card_id: Uuid) -> Result<i64, sqlx::Error> {
        ordering::count(pool, Section::Services, card_id).await
    }

    pub async fn reorder(pool: &PgPool, card_id: Uuid, ids: &[Uuid]) -> Result<(), ReorderError> {
        ordering::reorder(pool, Section::Services, card_id, ids).await
    }
}
