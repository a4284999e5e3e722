/// Digital business cards
///
/// A card is the public profile served at `/{username}`. Usernames are
/// globally unique, lowercase, 3-30 characters of `[a-z0-9-]`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE cards (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     username VARCHAR(30) NOT NULL,
///     display_name VARCHAR(100) NOT NULL,
///     job_title, company, bio, email, phone, website, location, avatar_url,
///     theme VARCHAR(32) NOT NULL DEFAULT 'classic',
///     is_public BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT cards_username_key UNIQUE (username)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::card::{Card, CreateCard, UpdateCard};
/// use sqlx::{PgConnection, PgExecutor, PgPool};
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let card = Card::create(&pool, CreateCard {
///     user_id,
///     username: "asha-rao".to_string(),
///     display_name: "Asha Rao".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let update = UpdateCard {
///     job_title: Some(Some("Architect".to_string())),
///     ..Default::default()
/// };
/// Card::update(&pool, card.id, update).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

/// Name of the unique constraint on `cards.username`
pub const USERNAME_CONSTRAINT: &str = "cards_username_key";

/// Checks the username format: 3-30 chars of lowercase ascii, digits and `-`
pub fn is_valid_username(username: &str) -> bool {
    (3..=30).contains(&username.len())
        && username
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Business card
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub theme: String,

    /// Hidden cards answer 404 on the public route
    pub is_public: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a card
#[derive(Debug, Clone, Default)]
pub struct CreateCard {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,

    /// Defaults to `classic`
    pub theme: Option<String>,

    /// Defaults to public
    pub is_public: Option<bool>,
}

/// Partial card update
///
/// `None` leaves a field alone. For nullable columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateCard {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub job_title: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub theme: Option<String>,
    pub is_public: Option<bool>,
}

impl UpdateCard {
    fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.job_title.is_none()
            && self.company.is_none()
            && self.bio.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.website.is_none()
            && self.location.is_none()
            && self.avatar_url.is_none()
            && self.theme.is_none()
            && self.is_public.is_none()
    }
}

impl Card {
    /// Creates a card
    ///
    /// # Errors
    ///
    /// Unique violation on [`USERNAME_CONSTRAINT`] if the username is taken.
    pub async fn create<'e, E>(executor: E, data: CreateCard) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Card>(
            r#"
            INSERT INTO cards (user_id, username, display_name, job_title, company, bio,
                               email, phone, website, location, avatar_url, theme, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    COALESCE($12, 'classic'), COALESCE($13, TRUE))
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.username.to_lowercase())
        .bind(data.display_name)
        .bind(data.job_title)
        .bind(data.company)
        .bind(data.bio)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.website)
        .bind(data.location)
        .bind(data.avatar_url)
        .bind(data.theme)
        .bind(data.is_public)
        .fetch_one(executor)
        .await
    }

    /// Finds a card by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads a card and locks the row until the transaction ends
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Finds a card by username (case-insensitive on input)
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>("SELECT * FROM cards WHERE username = $1")
            .bind(username.to_lowercase())
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's cards, newest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            "SELECT * FROM cards WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Counts a user's cards
    pub async fn count_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Whether a username is free, optionally ignoring one card (its own)
    pub async fn username_available(
        pool: &PgPool,
        username: &str,
        except_card: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let (taken,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM cards
                WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username.to_lowercase())
        .bind(except_card)
        .fetch_one(pool)
        .await?;

        Ok(!taken)
    }

    /// Applies a partial update
    ///
    /// Returns None if the card doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateCard,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_by_id(pool, id).await;
        }

        let mut query = String::from("UPDATE cards SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };

        push("username", data.username.is_some());
        push("display_name", data.display_name.is_some());
        push("job_title", data.job_title.is_some());
        push("company", data.company.is_some());
        push("bio", data.bio.is_some());
        push("email", data.email.is_some());
        push("phone", data.phone.is_some());
        push("website", data.website.is_some());
        push("location", data.location.is_some());
        push("avatar_url", data.avatar_url.is_some());
        push("theme", data.theme.is_some());
        push("is_public", data.is_public.is_some());

        query.push_str(" WHERE id = $1 RETURNING *");

        let mut q = sqlx::query_as::<_, Card>(&query).bind(id);

        if let Some(username) = data.username {
            q = q.bind(username.to_lowercase());
        }
        if let Some(display_name) = data.display_name {
            q = q.bind(display_name);
        }
        for value in [
            data.job_title,
            data.company,
            data.bio,
            data.email,
            data.phone,
            data.website,
            data.location,
            data.avatar_url,
        ]
        .into_iter()
        .flatten()
        {
            q = q.bind(value);
        }
        if let Some(theme) = data.theme {
            q = q.bind(theme);
        }
        if let Some(is_public) = data.is_public {
            q = q.bind(is_public);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a card and its sections, leads and analytics
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_format() {
        assert!(is_valid_username("asha"));
        assert!(is_valid_username("asha-rao-2"));
        assert!(is_valid_username("abc"));
        assert!(is_valid_username(&"a".repeat(30)));

        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username(&"a".repeat(31)));
        assert!(!is_valid_username("Asha"));
        assert!(!is_valid_username("asha_rao"));
        assert!(!is_valid_username("asha rao"));
        assert!(!is_valid_username("ashá"));
    }

    #[test]
    fn test_update_card_empty() {
        assert!(UpdateCard::default().is_empty());
        assert!(!UpdateCard {
            bio: Some(None),
            ..Default::default()
        }
        .is_empty());
    }
}
