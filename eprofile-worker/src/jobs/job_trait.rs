/// Core Job trait and types
///
/// A job is one unit of periodic maintenance. The orchestrator calls
/// [`Job::run`] once per sweep with the sweep's timestamp, so every job in a
/// sweep agrees on "now".
///
/// Jobs must be safe to repeat: a sweep that times out or fails is simply
/// retried on the next tick.
///
/// # Example
///
/// ```no_run
/// use eprofile_worker::jobs::{Job, JobReport, JobResult};
/// use async_trait::async_trait;
/// use chrono::{DateTime, Utc};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Job for Noop {
///     fn name(&self) -> &'static str {
///         "noop"
///     }
///
///     async fn run(&self, _now: DateTime<Utc>) -> JobResult<JobReport> {
///         Ok(JobReport::affected(0))
///     }
/// }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eprofile_shared::billing::BillingError;

/// Job error types
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Billing error: {0}")]
    Billing(#[from] BillingError),

    /// Run exceeded the configured timeout
    #[error("Job timed out after {0} seconds")]
    Timeout(u64),
}

/// Job result type alias
pub type JobResult<T> = Result<T, JobError>;

/// What one run changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Rows or users touched
    pub affected: u64,
}

impl JobReport {
    pub fn affected(affected: u64) -> Self {
        JobReport { affected }
    }
}

/// Periodic maintenance job
#[async_trait]
pub trait Job: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Performs one pass
    async fn run(&self, now: DateTime<Utc>) -> JobResult<JobReport>;
}
