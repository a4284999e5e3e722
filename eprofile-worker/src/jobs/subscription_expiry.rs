/// Subscription expiry sweep
///
/// Moves paid users whose `plan_expires_at` has passed back to FREE and logs
/// an `expired` subscription event for each. Until the sweep reaches a user,
/// the API already treats them as FREE through the effective plan, so the
/// sweep only brings the stored state in line.

use super::job_trait::{Job, JobReport, JobResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eprofile_shared::billing::expire_subscriptions;
use sqlx::PgPool;

pub struct SubscriptionExpiryJob {
    db: PgPool,
}

impl SubscriptionExpiryJob {
    pub fn new(db: PgPool) -> Self {
        SubscriptionExpiryJob { db }
    }
}

#[async_trait]
impl Job for SubscriptionExpiryJob {
    fn name(&self) -> &'static str {
        "subscription_expiry"
    }

    async fn run(&self, now: DateTime<Utc>) -> JobResult<JobReport> {
        let expired = expire_subscriptions(&self.db, now).await?;
        Ok(JobReport::affected(expired))
    }
}
