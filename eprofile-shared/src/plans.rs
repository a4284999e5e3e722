/// Subscription plans and plan-based resource limits
///
/// Every user is on one of three plans. Paid plans carry an expiry date; once
/// that date has passed the user is treated as FREE until the next payment,
/// even before the worker sweep rewrites the stored plan.
///
/// # Limits by Plan
///
/// | limit                   | FREE | STANDARD | PRO |
/// |-------------------------|------|----------|-----|
/// | cards                   | 1    | 3        | 10  |
/// | social links per card   | 5    | 15       | 30  |
/// | services per card       | 3    | 10       | 50  |
/// | gallery items per card  | 3    | 15       | 50  |
/// | testimonials per card   | 3    | 10       | 50  |
/// | analytics window (days) | 7    | 30       | 365 |
///
/// # Example
///
/// ```no_run
/// use eprofile_shared::plans::{LimitEnforcer, LimitedResource};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
///
/// // Fails with LimitError::LimitExceeded once the user is at their card cap
/// LimitEnforcer::enforce(&mut tx, user_id, LimitedResource::Cards).await?;
/// // ... insert the card on `tx` ...
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use std::fmt;
use uuid::Uuid;

use crate::models::card::Card;
use crate::models::ordering::{self, Section};
use crate::models::user::User;

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_tier", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    /// Default tier, never expires
    Free,

    /// Paid tier for individuals
    Standard,

    /// Paid tier for power users and small teams
    Pro,
}

impl Plan {
    /// Converts plan to its storage/display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Standard => "standard",
            Plan::Pro => "pro",
        }
    }

    /// Parses plan from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "standard" => Some(Plan::Standard),
            "pro" => Some(Plan::Pro),
            _ => None,
        }
    }

    /// Human-readable plan name used on invoices
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Free => "Free",
            Plan::Standard => "Standard",
            Plan::Pro => "Pro",
        }
    }

    /// Price of one month in minor currency units, None for FREE
    pub fn monthly_price_minor(&self) -> Option<i64> {
        match self {
            Plan::Free => None,
            Plan::Standard => Some(19_900),
            Plan::Pro => Some(49_900),
        }
    }

    /// Whether this is a paid plan
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    /// Ordering rank used to classify upgrades and downgrades
    pub fn rank(&self) -> u8 {
        match self {
            Plan::Free => 0,
            Plan::Standard => 1,
            Plan::Pro => 2,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the plan a user is actually entitled to
///
/// A paid plan without an expiry, or whose expiry is already in the past,
/// counts as FREE.
pub fn effective_plan(plan: Plan, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Plan {
    match (plan, expires_at) {
        (Plan::Free, _) | (_, None) => Plan::Free,
        (_, Some(expiry)) if expiry < now => Plan::Free,
        (paid, Some(_)) => paid,
    }
}

/// Resource that is capped by plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitedResource {
    /// Cards per user
    Cards,

    /// Social links per card
    SocialLinks,

    /// Services per card
    Services,

    /// Gallery items per card
    GalleryItems,

    /// Testimonials per card
    Testimonials,
}

impl LimitedResource {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitedResource::Cards => "Cards",
            LimitedResource::SocialLinks => "Social links",
            LimitedResource::Services => "Services",
            LimitedResource::GalleryItems => "Gallery items",
            LimitedResource::Testimonials => "Testimonials",
        }
    }

    /// Card section this resource is counted in, None for cards themselves
    pub fn section(&self) -> Option<Section> {
        match self {
            LimitedResource::Cards => None,
            LimitedResource::SocialLinks => Some(Section::SocialLinks),
            LimitedResource::Services => Some(Section::Services),
            LimitedResource::GalleryItems => Some(Section::Gallery),
            LimitedResource::Testimonials => Some(Section::Testimonials),
        }
    }
}

/// Resource caps for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub cards: u32,
    pub social_links: u32,
    pub services: u32,
    pub gallery_items: u32,
    pub testimonials: u32,

    /// Longest analytics window the plan may query, in days
    pub analytics_days: u32,
}

impl PlanLimits {
    /// Gets limits for a plan
    pub fn for_plan(plan: Plan) -> Self {
        match plan {
            Plan::Free => PlanLimits {
                cards: 1,
                social_links: 5,
                services: 3,
                gallery_items: 3,
                testimonials: 3,
                analytics_days: 7,
            },
            Plan::Standard => PlanLimits {
                cards: 3,
                social_links: 15,
                services: 10,
                gallery_items: 15,
                testimonials: 10,
                analytics_days: 30,
            },
            Plan::Pro => PlanLimits {
                cards: 10,
                social_links: 30,
                services: 50,
                gallery_items: 50,
                testimonials: 50,
                analytics_days: 365,
            },
        }
    }

    /// Gets limit for a specific resource
    pub fn get(&self, resource: LimitedResource) -> u32 {
        match resource {
            LimitedResource::Cards => self.cards,
            LimitedResource::SocialLinks => self.social_links,
            LimitedResource::Services => self.services,
            LimitedResource::GalleryItems => self.gallery_items,
            LimitedResource::Testimonials => self.testimonials,
        }
    }

    /// Clamps a requested analytics window to `[1, analytics_days]`
    pub fn clamp_analytics_days(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(7).clamp(1, self.analytics_days)
    }
}

/// Limit enforcement error
#[derive(Debug, thiserror::Error)]
pub enum LimitError {
    /// Plan limit reached
    #[error("{} limit reached for your plan ({current}/{limit})", .resource.as_str())]
    LimitExceeded {
        resource: LimitedResource,
        limit: u32,
        current: u32,
    },

    /// Per-card resource checked without a card
    #[error("{} is counted per card", .0.as_str())]
    CardRequired(LimitedResource),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result of a limit check
#[derive(Debug, Clone)]
pub struct LimitCheckResult {
    /// Whether one more resource may be created
    pub allowed: bool,

    /// Current count
    pub current: u32,

    /// Maximum allowed
    pub limit: u32,

    /// Remaining headroom
    pub remaining: u32,
}

impl LimitCheckResult {
    /// Builds a result from a count and a limit
    pub fn from_counts(current: u32, limit: u32) -> Self {
        LimitCheckResult {
            allowed: current < limit,
            current,
            limit,
            remaining: limit.saturating_sub(current),
        }
    }
}

/// Limit enforcement
///
/// Checks run on the caller's transaction. The row that owns the counted
/// resources is locked first (the user for cards, the card for sections), so
/// concurrent creates for the same owner run one after another and each
/// counts the rows committed before it. Insert on the same transaction and
/// commit to release the lock.
pub struct LimitEnforcer;

impl LimitEnforcer {
    /// Locks the user and checks whether one more card fits their plan
    pub async fn check(
        conn: &mut PgConnection,
        user_id: Uuid,
        resource: LimitedResource,
    ) -> Result<LimitCheckResult, LimitError> {
        if resource != LimitedResource::Cards {
            return Err(LimitError::CardRequired(resource));
        }

        let user = User::lock_by_id(&mut *conn, user_id)
            .await?
            .ok_or(LimitError::UserNotFound(user_id))?;

        let limit = PlanLimits::for_plan(user.effective_plan(Utc::now())).get(resource);
        let current = Card::count_by_user(&mut *conn, user_id).await?;

        Ok(LimitCheckResult::from_counts(current as u32, limit))
    }

    /// Locks the card and checks whether it may receive one more child of `resource`
    pub async fn check_for_card(
        conn: &mut PgConnection,
        user_id: Uuid,
        card_id: Uuid,
        resource: LimitedResource,
    ) -> Result<LimitCheckResult, LimitError> {
        let section = resource
            .section()
            .ok_or(LimitError::CardRequired(resource))?;

        Card::lock_by_id(&mut *conn, card_id).await?;

        let user = User::find_by_id(&mut *conn, user_id)
            .await?
            .ok_or(LimitError::UserNotFound(user_id))?;

        let limit = PlanLimits::for_plan(user.effective_plan(Utc::now())).get(resource);
        let current = ordering::count(&mut *conn, section, card_id).await?;

        Ok(LimitCheckResult::from_counts(current as u32, limit))
    }

    /// Enforces the card limit for a user
    pub async fn enforce(
        conn: &mut PgConnection,
        user_id: Uuid,
        resource: LimitedResource,
    ) -> Result<(), LimitError> {
        let result = Self::check(conn, user_id, resource).await?;
        Self::into_error(resource, result)
    }

    /// Enforces a per-card limit
    pub async fn enforce_for_card(
        conn: &mut PgConnection,
        user_id: Uuid,
        card_id: Uuid,
        resource: LimitedResource,
    ) -> Result<(), LimitError> {
        let result = Self::check_for_card(conn, user_id, card_id, resource).await?;
        Self::into_error(resource, result)
    }

    fn into_error(resource: LimitedResource, result: LimitCheckResult) -> Result<(), LimitError> {
        if !result.allowed {
            tracing::debug!(
                resource = resource.as_str(),
                current = result.current,
                limit = result.limit,
                "Plan limit reached"
            );
            return Err(LimitError::LimitExceeded {
                resource,
                limit: result.limit,
                current: result.current,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_plan_limits_free() {
        let limits = PlanLimits::for_plan(Plan::Free);
        assert_eq!(limits.cards, 1);
        assert_eq!(limits.services, 3);
        assert_eq!(limits.analytics_days, 7);
    }

    #[test]
    fn test_plan_limits_grow_with_tier() {
        let free = PlanLimits::for_plan(Plan::Free);
        let standard = PlanLimits::for_plan(Plan::Standard);
        let pro = PlanLimits::for_plan(Plan::Pro);

        for resource in [
            LimitedResource::Cards,
            LimitedResource::SocialLinks,
            LimitedResource::Services,
            LimitedResource::GalleryItems,
            LimitedResource::Testimonials,
        ] {
            assert!(free.get(resource) < standard.get(resource));
            assert!(standard.get(resource) <= pro.get(resource));
        }
    }

    #[test]
    fn test_effective_plan_free_stays_free() {
        let now = Utc::now();
        assert_eq!(effective_plan(Plan::Free, None, now), Plan::Free);
        assert_eq!(
            effective_plan(Plan::Free, Some(now + Duration::days(10)), now),
            Plan::Free
        );
    }

    #[test]
    fn test_effective_plan_active_paid() {
        let now = Utc::now();
        assert_eq!(
            effective_plan(Plan::Pro, Some(now + Duration::days(1)), now),
            Plan::Pro
        );
    }

    #[test]
    fn test_effective_plan_expired_paid() {
        let now = Utc::now();
        assert_eq!(
            effective_plan(Plan::Standard, Some(now - Duration::seconds(1)), now),
            Plan::Free
        );
        assert_eq!(effective_plan(Plan::Pro, None, now), Plan::Free);
    }

    #[test]
    fn test_effective_plan_expiry_boundary_is_active() {
        let now = Utc::now();
        // Expiry exactly now is not yet in the past
        assert_eq!(effective_plan(Plan::Pro, Some(now), now), Plan::Pro);
    }

    #[test]
    fn test_clamp_analytics_days() {
        let free = PlanLimits::for_plan(Plan::Free);
        assert_eq!(free.clamp_analytics_days(None), 7);
        assert_eq!(free.clamp_analytics_days(Some(90)), 7);
        assert_eq!(free.clamp_analytics_days(Some(0)), 1);

        let pro = PlanLimits::for_plan(Plan::Pro);
        assert_eq!(pro.clamp_analytics_days(Some(90)), 90);
        assert_eq!(pro.clamp_analytics_days(Some(1000)), 365);
    }

    #[test]
    fn test_limit_check_result() {
        let result = LimitCheckResult::from_counts(2, 3);
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);

        let result = LimitCheckResult::from_counts(3, 3);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_plan_parse_and_price() {
        assert_eq!(Plan::parse("PRO"), Some(Plan::Pro));
        assert_eq!(Plan::parse("standard"), Some(Plan::Standard));
        assert_eq!(Plan::parse("gold"), None);
        assert_eq!(Plan::Free.monthly_price_minor(), None);
        assert_eq!(Plan::Standard.monthly_price_minor(), Some(19_900));
        assert!(Plan::Pro.rank() > Plan::Standard.rank());
    }

    #[test]
    fn test_limit_error_display() {
        let err = LimitError::LimitExceeded {
            resource: LimitedResource::Cards,
            limit: 1,
            current: 1,
        };
        assert_eq!(err.to_string(), "Cards limit reached for your plan (1/1)");
    }
}
