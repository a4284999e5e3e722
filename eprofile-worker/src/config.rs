/// Worker configuration
///
/// Loaded from the environment after reading `.env`:
///
/// - `DATABASE_URL` (required)
/// - `DATABASE_MAX_CONNECTIONS` (default 5)
/// - `WORKER_SWEEP_INTERVAL_SECS` (default 300)
/// - `WORKER_JOB_TIMEOUT_SECS` (default 120)
/// - `ANALYTICS_RETENTION_DAYS` (default 400, at least 365 so the longest
///   plan window stays intact)

use std::env;
use std::str::FromStr;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RETENTION_DAYS: u32 = 400;

/// Shortest retention that still covers the PRO analytics window
pub const MIN_RETENTION_DAYS: u32 = 365;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub sweep_interval_secs: u64,
    pub job_timeout_secs: u64,
    pub analytics_retention_days: u32,
}

fn parse_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a positive number, got {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let config = WorkerConfig {
            database_url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            sweep_interval_secs: parse_or("WORKER_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
            job_timeout_secs: parse_or("WORKER_JOB_TIMEOUT_SECS", DEFAULT_JOB_TIMEOUT_SECS)?,
            analytics_retention_days: parse_or("ANALYTICS_RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sweep_interval_secs == 0 {
            anyhow::bail!("WORKER_SWEEP_INTERVAL_SECS must be greater than zero");
        }
        if self.job_timeout_secs == 0 {
            anyhow::bail!("WORKER_JOB_TIMEOUT_SECS must be greater than zero");
        }
        if self.analytics_retention_days < MIN_RETENTION_DAYS {
            anyhow::bail!(
                "ANALYTICS_RETENTION_DAYS must be at least {}",
                MIN_RETENTION_DAYS
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkerConfig {
        WorkerConfig {
            database_url: "postgresql://localhost/test".to_string(),
            max_connections: 5,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            analytics_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_retention_must_cover_plan_window() {
        let mut c = config();
        c.analytics_retention_days = 30;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut c = config();
        c.sweep_interval_secs = 0;
        assert!(c.validate().is_err());
    }
}
