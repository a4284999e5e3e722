/// Analytics retention
///
/// Deletes card views and button clicks older than the retention period.
/// Leads are never purged here; they belong to the card owner.

use super::job_trait::{Job, JobReport, JobResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use eprofile_shared::models::analytics::Analytics;
use sqlx::PgPool;

pub struct AnalyticsRetentionJob {
    db: PgPool,
    retention_days: u32,
}

impl AnalyticsRetentionJob {
    pub fn new(db: PgPool, retention_days: u32) -> Self {
        AnalyticsRetentionJob { db, retention_days }
    }

    /// Events strictly before this instant are deleted
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.retention_days))
    }
}

#[async_trait]
impl Job for AnalyticsRetentionJob {
    fn name(&self) -> &'static str {
        "analytics_retention"
    }

    async fn run(&self, now: DateTime<Utc>) -> JobResult<JobReport> {
        let cutoff = self.cutoff(now);
        let purged = Analytics::delete_before(&self.db, cutoff).await?;

        if purged.views + purged.clicks > 0 {
            tracing::info!(
                views = purged.views,
                clicks = purged.clicks,
                cutoff = %cutoff,
                "Purged old analytics events"
            );
        }

        Ok(JobReport::affected(purged.views + purged.clicks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_cutoff() {
        let db = PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/unused")
            .unwrap();
        let job = AnalyticsRetentionJob::new(db, 400);
        let now = Utc::now();

        assert_eq!(job.cutoff(now), now - Duration::days(400));
        assert_eq!(job.name(), "analytics_retention");
    }
}
