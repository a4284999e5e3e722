/// User accounts
///
/// A user owns cards and a subscription. The stored `plan` is whatever was
/// last paid for; use [`User::effective_plan`] for anything that gates
/// features, since a lapsed plan may not have been swept back to FREE yet.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(100),
///     plan plan_tier NOT NULL DEFAULT 'free',
///     plan_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::user::{CreateUser, User};
/// use eprofile_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "asha@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Asha Rao".to_string()),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ASHA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::plans::{effective_plan, Plan};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique, compared case-insensitively (CITEXT)
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub name: Option<String>,

    /// Last plan paid for
    pub plan: Plan,

    /// When the paid plan lapses, None on FREE
    pub plan_expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Already hashed password
    pub password_hash: String,

    pub name: Option<String>,
}

impl User {
    /// Plan the user is entitled to at `now`
    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        effective_plan(self.plan, self.plan_expires_at, now)
    }

    /// Whole days left on the paid plan, zero when FREE or lapsed
    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        match (self.effective_plan(now), self.plan_expires_at) {
            (Plan::Free, _) | (_, None) => 0,
            (_, Some(expiry)) => {
                let secs = (expiry - now).num_seconds().max(0);
                (secs + 86_399) / 86_400
            }
        }
    }

    /// Creates a user on the FREE plan
    ///
    /// # Errors
    ///
    /// Fails with a unique violation on `users_email_key` if the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, plan, plan_expires_at,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .fetch_one(pool)
        .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, plan, plan_expires_at,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Loads a user and locks the row until the transaction ends
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, plan, plan_expires_at,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, plan, plan_expires_at,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Updates the display name
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        name: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, name, plan, plan_expires_at,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the password hash
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamps a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets plan and expiry
    ///
    /// Accepts any executor so billing can call it inside a transaction.
    pub async fn set_plan<'e, E>(
        executor: E,
        id: Uuid,
        plan: Plan,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET plan = $2, plan_expires_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, password_hash, name, plan, plan_expires_at,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(id)
        .bind(plan)
        .bind(expires_at)
        .fetch_optional(executor)
        .await
    }

    /// Drops a lapsed paid plan back to FREE
    ///
    /// The expiry condition is re-checked in the UPDATE so a renewal that
    /// landed after the user was listed is not undone. Returns None when
    /// nothing changed.
    pub async fn expire_plan<'e, E>(
        executor: E,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET plan = 'free', plan_expires_at = NULL, updated_at = NOW()
            WHERE id = $1
              AND plan <> 'free'
              AND (plan_expires_at IS NULL OR plan_expires_at < $2)
            RETURNING id, email, password_hash, name, plan, plan_expires_at,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(executor)
        .await
    }

    /// Paid users whose expiry is before `now`
    pub async fn list_expired_paid(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, plan, plan_expires_at,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE plan <> 'free'
              AND (plan_expires_at IS NULL OR plan_expires_at < $1)
            ORDER BY plan_expires_at NULLS FIRST
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await
    }

    /// Deletes a user and, by cascade, everything they own
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(plan: Plan, expires_at: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "asha@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: None,
            plan,
            plan_expires_at: expires_at,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(Plan::Free, None)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["plan"], "FREE");
    }

    #[test]
    fn test_effective_plan_follows_expiry() {
        let now = Utc::now();
        assert_eq!(
            user(Plan::Pro, Some(now + Duration::days(3))).effective_plan(now),
            Plan::Pro
        );
        assert_eq!(
            user(Plan::Pro, Some(now - Duration::days(3))).effective_plan(now),
            Plan::Free
        );
    }

    #[test]
    fn test_days_remaining() {
        let now = Utc::now();
        assert_eq!(user(Plan::Free, None).days_remaining(now), 0);
        assert_eq!(
            user(Plan::Standard, Some(now + Duration::days(30))).days_remaining(now),
            30
        );
        assert_eq!(
            user(Plan::Standard, Some(now + Duration::hours(5))).days_remaining(now),
            1
        );
        assert_eq!(
            user(Plan::Standard, Some(now - Duration::hours(5))).days_remaining(now),
            0
        );
    }
}
