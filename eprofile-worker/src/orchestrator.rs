/// Worker orchestrator
///
/// Runs every registered job once per sweep, on a fixed interval, until the
/// shutdown token is cancelled.
///
/// # Architecture
///
/// ```text
/// Orchestrator
///   ├─> interval tick (first tick fires immediately)
///   ├─> for each job: run with timeout, log outcome
///   └─> stop on CancellationToken
/// ```
///
/// Jobs in a sweep run one after another. A failing or timed-out job is
/// logged and does not stop the others; it is retried on the next sweep.
///
/// # Example
///
/// ```no_run
/// use eprofile_worker::jobs::SubscriptionExpiryJob;
/// use eprofile_worker::orchestrator::{JobOrchestrator, OrchestratorConfig};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let mut orchestrator = JobOrchestrator::new(OrchestratorConfig::default());
/// orchestrator.register_job(Arc::new(SubscriptionExpiryJob::new(pool)));
///
/// let shutdown = orchestrator.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// orchestrator.run().await;
/// # Ok(())
/// # }
/// ```

use crate::jobs::{Job, JobError, JobReport};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, timeout, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Worker orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time between sweeps
    pub sweep_interval: Duration,

    /// Upper bound for a single job run
    pub job_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            sweep_interval: Duration::from_secs(300),
            job_timeout: Duration::from_secs(120),
        }
    }
}

/// Outcome of one job within a sweep
#[derive(Debug)]
pub struct JobOutcome {
    pub job: &'static str,
    pub result: Result<JobReport, JobError>,
}

/// Worker orchestrator
pub struct JobOrchestrator {
    jobs: Vec<Arc<dyn Job>>,
    config: OrchestratorConfig,
    shutdown_token: CancellationToken,
}

impl JobOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        JobOrchestrator {
            jobs: Vec::new(),
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Registers a job; jobs run in registration order
    pub fn register_job(&mut self, job: Arc<dyn Job>) {
        tracing::info!(job = job.name(), "Registering job");
        self.jobs.push(job);
    }

    /// Gets shutdown token
    ///
    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs every job once
    pub async fn run_once(&self) -> Vec<JobOutcome> {
        let now = Utc::now();
        let mut outcomes = Vec::with_capacity(self.jobs.len());

        for job in &self.jobs {
            let started = Instant::now();
            let result = match timeout(self.config.job_timeout, job.run(now)).await {
                Ok(result) => result,
                Err(_) => Err(JobError::Timeout(self.config.job_timeout.as_secs())),
            };

            match &result {
                Ok(report) => tracing::debug!(
                    job = job.name(),
                    affected = report.affected,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job finished"
                ),
                Err(e) => tracing::error!(job = job.name(), error = %e, "Job failed"),
            }

            outcomes.push(JobOutcome {
                job: job.name(),
                result,
            });
        }

        outcomes
    }

    /// Sweeps on the configured interval until shutdown
    ///
    /// A sweep in progress when shutdown is requested is abandoned; every job
    /// is idempotent, so the next start picks up where it left off.
    pub async fn run(&self) {
        tracing::info!(
            jobs = self.jobs.len(),
            interval_secs = self.config.sweep_interval.as_secs(),
            "Worker orchestrator starting"
        );

        let mut ticker = interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested during sweep");
                    break;
                }
                _ = self.run_once() => {}
            }
        }

        tracing::info!("Worker orchestrator shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobResult;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingJob {
        runs: AtomicU64,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run(&self, _now: DateTime<Utc>) -> JobResult<JobReport> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(JobReport::affected(n))
        }
    }

    struct SlowJob;

    #[async_trait]
    impl Job for SlowJob {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self, _now: DateTime<Utc>) -> JobResult<JobReport> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(JobReport::default())
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            sweep_interval: Duration::from_secs(60),
            job_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_orchestrator_config_default() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.job_timeout, Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_block_other_jobs() {
        let counting = Arc::new(CountingJob { runs: AtomicU64::new(0) });

        let mut orchestrator = JobOrchestrator::new(config());
        orchestrator.register_job(Arc::new(SlowJob));
        orchestrator.register_job(counting.clone());

        let outcomes = orchestrator.run_once().await;

        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].result, Err(JobError::Timeout(5))));
        assert_eq!(outcomes[1].job, "counting");
        assert_eq!(outcomes[1].result.as_ref().unwrap().affected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_until_cancelled() {
        let counting = Arc::new(CountingJob { runs: AtomicU64::new(0) });

        let mut orchestrator = JobOrchestrator::new(config());
        orchestrator.register_job(counting.clone());
        let shutdown = orchestrator.shutdown_token();

        let handle = tokio::spawn(async move { orchestrator.run().await });

        // First tick is immediate, then one per minute
        tokio::time::sleep(Duration::from_secs(150)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(counting.runs.load(Ordering::SeqCst), 3);
    }
}
