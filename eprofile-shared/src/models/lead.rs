/// Leads captured by public contact forms
///
/// A lead belongs to the card whose form it came through. Owners triage them
/// by moving the status through `new → contacted → converted`, or archive
/// them.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE lead_status AS ENUM ('new', 'contacted', 'converted', 'archived');
///
/// CREATE TABLE leads (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     card_id UUID NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255),
///     phone VARCHAR(32),
///     message TEXT,
///     status lead_status NOT NULL DEFAULT 'new',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::lead::{Lead, LeadFilter, LeadStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let filter = LeadFilter { status: Some(LeadStatus::New), ..Default::default() };
///
/// let page = Lead::list_for_user(&pool, user_id, &filter, 20, 0).await?;
/// let total = Lead::count_for_user(&pool, user_id, &filter).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Lead triage status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Archived,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Converted => "converted",
            LeadStatus::Archived => "archived",
        }
    }

    /// Parses status from its lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "converted" => Some(LeadStatus::Converted),
            "archived" => Some(LeadStatus::Archived),
            _ => None,
        }
    }
}

/// Lead
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub card_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a contact-form submission
#[derive(Debug, Clone)]
pub struct CreateLead {
    pub card_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
}

/// Optional filters for the dashboard lead list
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub card_id: Option<Uuid>,
    pub status: Option<LeadStatus>,
}

impl Lead {
    /// Records a submission with status `new`
    pub async fn create(pool: &PgPool, data: CreateLead) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (card_id, name, email, phone, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, card_id, name, email, phone, message, status, created_at, updated_at
            "#,
        )
        .bind(data.card_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.message)
        .fetch_one(pool)
        .await
    }

    /// Finds a lead by ID
    ///
    /// Callers check ownership through the lead's card.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"
            SELECT id, card_id, name, email, phone, message, status, created_at, updated_at
            FROM leads
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists leads across all of a user's cards, newest first
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the cards
    /// * `filter` - Optional card and status filters
    /// * `limit`, `offset` - Page window
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &LeadFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"
            SELECT l.id, l.card_id, l.name, l.email, l.phone, l.message, l.status,
                   l.created_at, l.updated_at
            FROM leads l
            JOIN cards c ON c.id = l.card_id
            WHERE c.user_id = $1
              AND ($2::uuid IS NULL OR l.card_id = $2)
              AND ($3::lead_status IS NULL OR l.status = $3)
            ORDER BY l.created_at DESC, l.id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(filter.card_id)
        .bind(filter.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Counts leads matching the same filters as [`Lead::list_for_user`]
    pub async fn count_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &LeadFilter,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM leads l
            JOIN cards c ON c.id = l.card_id
            WHERE c.user_id = $1
              AND ($2::uuid IS NULL OR l.card_id = $2)
              AND ($3::lead_status IS NULL OR l.status = $3)
            "#,
        )
        .bind(user_id)
        .bind(filter.card_id)
        .bind(filter.status)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Moves a lead to a new status
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: LeadStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, card_id, name, email, phone, message, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Leads received by a card since `since`
    pub async fn count_by_card_since(
        pool: &PgPool,
        card_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM leads WHERE card_id = $1 AND created_at >= $2",
        )
        .bind(card_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Leads received across all of a user's cards since `since`
    pub async fn count_for_user_since(
        pool: &PgPool,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM leads l
            JOIN cards c ON c.id = l.card_id
            WHERE c.user_id = $1 AND l.created_at >= $2
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}
