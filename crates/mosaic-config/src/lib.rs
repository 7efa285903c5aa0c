//! Scheduler daemon configuration schema (§6.3): a YAML document describing
//! one or more recurring mosaic-selection jobs, deserialized with `serde` +
//! `serde_yaml` and validated at load time so a bad config is rejected
//! before any job runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod date_range;
pub mod job;
pub mod schedule;

pub use date_range::DateRangeConfig;
pub use job::{AutoSelectConfig, FilterConfig, JobConfig};
pub use schedule::ScheduleConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Weight sums in §6.3 must land within this tolerance of 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,
    #[serde(default = "default_true")]
    pub job_coalesce: bool,
    #[serde(default = "default_job_max_instances")]
    pub job_max_instances: u32,
    pub jobs: Vec<JobConfig>,
}

fn default_max_concurrent_jobs() -> u32 {
    1
}

fn default_job_max_instances() -> u32 {
    1
}

pub(crate) fn default_true() -> bool {
    true
}

impl SchedulerConfig {
    /// Parse and validate a config document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: SchedulerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config document from a file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Serialize back to YAML in normalized form (defaults filled in).
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.max_concurrent_jobs < 1 {
            return Err(ConfigError::Invalid("max_concurrent_jobs must be >= 1".into()));
        }
        if self.job_max_instances < 1 {
            return Err(ConfigError::Invalid("job_max_instances must be >= 1".into()));
        }
        if self.jobs.is_empty() {
            return Err(ConfigError::Invalid("jobs must be non-empty".into()));
        }

        let mut seen_names = std::collections::HashSet::new();
        for job in &self.jobs {
            if !seen_names.insert(job.name.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate job name: {}", job.name)));
            }
            job.validate()?;
        }
        Ok(())
    }
}
