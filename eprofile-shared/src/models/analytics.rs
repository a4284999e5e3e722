/// Card views, button clicks and their aggregations
///
/// Views and clicks are append-only event rows written from the public card
/// routes. Dashboards read them back as grouped counts over a window of whole
/// UTC days ending today.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE card_views (
///     id BIGSERIAL PRIMARY KEY,
///     card_id UUID NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
///     referrer VARCHAR(512),
///     user_agent VARCHAR(512),
///     viewed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE button_clicks (
///     id BIGSERIAL PRIMARY KEY,
///     card_id UUID NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
///     button VARCHAR(50) NOT NULL,
///     clicked_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::models::analytics::{Analytics, AnalyticsScope};
/// use chrono::Utc;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, card_id: Uuid) -> Result<(), sqlx::Error> {
/// Analytics::record_view(&pool, card_id, Some("https://t.co/x"), None).await?;
///
/// let summary = Analytics::summary(&pool, AnalyticsScope::Card(card_id), 7, Utc::now()).await?;
/// assert_eq!(summary.views_by_day.len(), 7);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Referrer label for views without a referrer
pub const DIRECT_REFERRER: &str = "direct";

/// Number of referrers returned by [`Analytics::top_referrers`]
pub const TOP_REFERRERS: i64 = 10;

/// What the aggregation covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsScope {
    /// One card
    Card(Uuid),

    /// All cards of one user
    User(Uuid),
}

impl AnalyticsScope {
    fn binds(&self) -> (Option<Uuid>, Option<Uuid>) {
        match *self {
            AnalyticsScope::Card(id) => (Some(id), None),
            AnalyticsScope::User(id) => (None, Some(id)),
        }
    }
}

/// Views on one UTC day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ButtonCount {
    pub button: String,
    pub count: i64,
}

/// Dashboard analytics over a window
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub days: u32,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_views: i64,
    pub total_clicks: i64,
    pub total_leads: i64,

    /// Exactly `days` entries, oldest first, zero-filled
    pub views_by_day: Vec<DailyCount>,

    pub top_referrers: Vec<ReferrerCount>,
    pub clicks_by_button: Vec<ButtonCount>,
}

/// Rows removed by a retention pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub views: u64,
    pub clicks: u64,
}

/// First day of a `days`-long window ending on `today`
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days.max(1)) - 1)
}

/// Expands sparse per-day counts into exactly `days` entries starting at `start`
///
/// Days missing from `sparse` get a zero count. Entries outside the window
/// are dropped.
pub fn zero_fill(sparse: &[DailyCount], start: NaiveDate, days: u32) -> Vec<DailyCount> {
    let counts: HashMap<NaiveDate, i64> = sparse.iter().map(|d| (d.date, d.count)).collect();

    (0..i64::from(days))
        .map(|offset| {
            let date = start + Duration::days(offset);
            DailyCount {
                date,
                count: counts.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Namespace for analytics queries
pub struct Analytics;

impl Analytics {
    /// Appends a view event
    pub async fn record_view(
        pool: &PgPool,
        card_id: Uuid,
        referrer: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO card_views (card_id, referrer, user_agent) VALUES ($1, LEFT($2, 512), LEFT($3, 512))",
        )
        .bind(card_id)
        .bind(referrer)
        .bind(user_agent)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Appends a click event
    pub async fn record_click(pool: &PgPool, card_id: Uuid, button: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO button_clicks (card_id, button) VALUES ($1, $2)")
            .bind(card_id)
            .bind(button)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Total views since `since`
    pub async fn total_views(
        pool: &PgPool,
        scope: AnalyticsScope,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (card_id, user_id) = scope.binds();

        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM card_views v
            JOIN cards c ON c.id = v.card_id
            WHERE ($1::uuid IS NULL OR v.card_id = $1)
              AND ($2::uuid IS NULL OR c.user_id = $2)
              AND v.viewed_at >= $3
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Total clicks since `since`
    pub async fn total_clicks(
        pool: &PgPool,
        scope: AnalyticsScope,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let (card_id, user_id) = scope.binds();

        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM button_clicks b
            JOIN cards c ON c.id = b.card_id
            WHERE ($1::uuid IS NULL OR b.card_id = $1)
              AND ($2::uuid IS NULL OR c.user_id = $2)
              AND b.clicked_at >= $3
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Views per UTC day for the `days` days ending on `today`, zero-filled
    pub async fn views_by_day(
        pool: &PgPool,
        scope: AnalyticsScope,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<DailyCount>, sqlx::Error> {
        let (card_id, user_id) = scope.binds();
        let start = window_start(today, days);

        let sparse = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT (v.viewed_at AT TIME ZONE 'UTC')::date AS date, COUNT(*) AS count
            FROM card_views v
            JOIN cards c ON c.id = v.card_id
            WHERE ($1::uuid IS NULL OR v.card_id = $1)
              AND ($2::uuid IS NULL OR c.user_id = $2)
              AND v.viewed_at >= ($3::date)::timestamp AT TIME ZONE 'UTC'
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(start)
        .fetch_all(pool)
        .await?;

        Ok(zero_fill(&sparse, start, days))
    }

    /// Most common referrers since `since`, empty/missing grouped as "direct"
    pub async fn top_referrers(
        pool: &PgPool,
        scope: AnalyticsScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReferrerCount>, sqlx::Error> {
        let (card_id, user_id) = scope.binds();

        sqlx::query_as::<_, ReferrerCount>(
            r#"
            SELECT COALESCE(NULLIF(TRIM(v.referrer), ''), $4) AS referrer, COUNT(*) AS count
            FROM card_views v
            JOIN cards c ON c.id = v.card_id
            WHERE ($1::uuid IS NULL OR v.card_id = $1)
              AND ($2::uuid IS NULL OR c.user_id = $2)
              AND v.viewed_at >= $3
            GROUP BY 1
            ORDER BY count DESC, referrer
            LIMIT $5
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(since)
        .bind(DIRECT_REFERRER)
        .bind(TOP_REFERRERS)
        .fetch_all(pool)
        .await
    }

    /// Clicks per button since `since`, most clicked first
    pub async fn clicks_by_button(
        pool: &PgPool,
        scope: AnalyticsScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<ButtonCount>, sqlx::Error> {
        let (card_id, user_id) = scope.binds();

        sqlx::query_as::<_, ButtonCount>(
            r#"
            SELECT b.button, COUNT(*) AS count
            FROM button_clicks b
            JOIN cards c ON c.id = b.card_id
            WHERE ($1::uuid IS NULL OR b.card_id = $1)
              AND ($2::uuid IS NULL OR c.user_id = $2)
              AND b.clicked_at >= $3
            GROUP BY b.button
            ORDER BY count DESC, b.button
            "#,
        )
        .bind(card_id)
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Everything the analytics dashboard shows for one window
    ///
    /// `days` is expected to be clamped to the plan window already.
    pub async fn summary(
        pool: &PgPool,
        scope: AnalyticsScope,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSummary, sqlx::Error> {
        let days = days.max(1);
        let today = now.date_naive();
        let from = window_start(today, days);
        let since = from.and_time(NaiveTime::default()).and_utc();

        let views_by_day = Self::views_by_day(pool, scope, days, today).await?;
        let total_views = Self::total_views(pool, scope, since).await?;
        let total_clicks = Self::total_clicks(pool, scope, since).await?;
        let top_referrers = Self::top_referrers(pool, scope, since).await?;
        let clicks_by_button = Self::clicks_by_button(pool, scope, since).await?;

        let total_leads = match scope {
            AnalyticsScope::Card(card_id) => {
                super::lead::Lead::count_by_card_since(pool, card_id, since).await?
            }
            AnalyticsScope::User(user_id) => {
                super::lead::Lead::count_for_user_since(pool, user_id, since).await?
            }
        };

        Ok(AnalyticsSummary {
            days,
            from,
            to: today,
            total_views,
            total_clicks,
            total_leads,
            views_by_day,
            top_referrers,
            clicks_by_button,
        })
    }

    /// Deletes view and click events older than `cutoff`
    pub async fn delete_before(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<PurgeCounts, sqlx::Error> {
        let views = sqlx::query("DELETE FROM card_views WHERE viewed_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?
            .rows_affected();

        let clicks = sqlx::query("DELETE FROM button_clicks WHERE clicked_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?
            .rows_affected();

        Ok(PurgeCounts { views, clicks })
    }
}
