/// Periodic maintenance jobs
///
/// # Jobs
///
/// - **subscription_expiry**: downgrades lapsed paid plans to FREE
/// - **analytics_retention**: drops view and click events past retention

pub mod analytics_retention;
pub mod job_trait;
pub mod subscription_expiry;

pub use analytics_retention::AnalyticsRetentionJob;
pub use job_trait::{Job, JobError, JobReport, JobResult};
pub use subscription_expiry::SubscriptionExpiryJob;
