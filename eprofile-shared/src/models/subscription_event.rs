/// Subscription lifecycle log
///
/// One row per plan transition: activation from FREE, renewal, upgrade,
/// downgrade, and expiry back to FREE. Rows are only ever inserted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::plans::Plan;

/// Kind of plan transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_event_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionEventType {
    Activated,
    Renewed,
    Upgraded,
    Downgraded,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubscriptionEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_type: SubscriptionEventType,
    pub from_plan: Plan,
    pub to_plan: Plan,

    /// Expiry after the transition, None when it ends on FREE
    pub expires_at: Option<DateTime<Utc>>,

    /// Payment that caused the transition
    pub payment_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for [`SubscriptionEvent::record`]
#[derive(Debug, Clone)]
pub struct NewSubscriptionEvent {
    pub user_id: Uuid,
    pub event_type: SubscriptionEventType,
    pub from_plan: Plan,
    pub to_plan: Plan,
    pub expires_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
}

impl SubscriptionEvent {
    /// Appends an event; accepts a transaction
    pub async fn record<'e, E>(executor: E, data: NewSubscriptionEvent) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, SubscriptionEvent>(
            r#"
            INSERT INTO subscription_events (user_id, event_type, from_plan, to_plan, expires_at, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, event_type, from_plan, to_plan, expires_at, payment_id, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.event_type)
        .bind(data.from_plan)
        .bind(data.to_plan)
        .bind(data.expires_at)
        .bind(data.payment_id)
        .fetch_one(executor)
        .await
    }

    /// A user's events, newest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionEvent>(
            r#"
            SELECT id, user_id, event_type, from_plan, to_plan, expires_at, payment_id, created_at
            FROM subscription_events
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
