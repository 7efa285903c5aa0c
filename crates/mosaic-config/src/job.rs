//! Per-job configuration (§6.3): AOI, output directory, schedule, date
//! range, candidate filters, and selection strategy.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, DateRangeConfig, Result, ScheduleConfig, WEIGHT_SUM_TOLERANCE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductLevel {
    #[serde(rename = "L1C")]
    L1C,
    #[serde(rename = "L2A")]
    L2A,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_max_cloud_cover")]
    pub max_cloud_cover: f64,
    #[serde(default)]
    pub min_aoi_coverage: f64,
    #[serde(default = "default_product_level")]
    pub product_level: ProductLevel,
}

fn default_max_cloud_cover() -> f64 {
    100.0
}

fn default_product_level() -> ProductLevel {
    ProductLevel::L2A
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_cloud_cover: default_max_cloud_cover(),
            min_aoi_coverage: 0.0,
            product_level: default_product_level(),
        }
    }
}

impl FilterConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.max_cloud_cover) {
            return Err(ConfigError::Invalid("max_cloud_cover must be in 0..100".into()));
        }
        if !(0.0..=100.0).contains(&self.min_aoi_coverage) {
            return Err(ConfigError::Invalid("min_aoi_coverage must be in 0..100".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    BestN,
    AllAboveThreshold,
    BestPerWeek,
    CoverageGreedy,
    CoverageOptimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSelectConfig {
    pub strategy: SelectionStrategy,
    #[serde(default = "default_max_products")]
    pub max_products: u32,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default = "default_aoi_coverage_weight")]
    pub aoi_coverage_weight: f64,
    #[serde(default = "default_cloud_cover_weight")]
    pub cloud_cover_weight: f64,
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
    #[serde(default = "default_min_coverage_fraction")]
    pub min_coverage_fraction: f64,
    pub grid_spacing_meters: Option<f64>,
    #[serde(default = "default_solver_timeout_seconds")]
    pub solver_timeout_seconds: f64,
    #[serde(default = "default_coverage_weight")]
    pub coverage_cloud_weight: f64,
    #[serde(default = "default_coverage_weight")]
    pub coverage_quality_weight: f64,
}

fn default_max_products() -> u32 {
    5
}
fn default_quality_threshold() -> f64 {
    0.7
}
fn default_aoi_coverage_weight() -> f64 {
    0.4
}
fn default_cloud_cover_weight() -> f64 {
    0.4
}
fn default_recency_weight() -> f64 {
    0.2
}
fn default_min_coverage_fraction() -> f64 {
    0.99
}
fn default_solver_timeout_seconds() -> f64 {
    300.0
}
fn default_coverage_weight() -> f64 {
    0.5
}

impl AutoSelectConfig {
    fn validate(&self) -> Result<()> {
        if self.max_products == 0 {
            return Err(ConfigError::Invalid("max_products must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(ConfigError::Invalid("quality_threshold must be in 0..1".into()));
        }
        let score_weight_sum = self.aoi_coverage_weight + self.cloud_cover_weight + self.recency_weight;
        if (score_weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "aoi_coverage_weight + cloud_cover_weight + recency_weight must sum to 1.0 (±{WEIGHT_SUM_TOLERANCE}), got {score_weight_sum}"
            )));
        }
        if !(0.5..=1.0).contains(&self.min_coverage_fraction) {
            return Err(ConfigError::Invalid("min_coverage_fraction must be in 0.5..1.0".into()));
        }
        if let Some(spacing) = self.grid_spacing_meters {
            if spacing <= 0.0 {
                return Err(ConfigError::Invalid("grid_spacing_meters must be > 0".into()));
            }
        }
        if self.solver_timeout_seconds <= 0.0 {
            return Err(ConfigError::Invalid("solver_timeout_seconds must be > 0".into()));
        }
        let coverage_weight_sum = self.coverage_cloud_weight + self.coverage_quality_weight;
        if (coverage_weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::Invalid(format!(
                "coverage_cloud_weight + coverage_quality_weight must sum to 1.0 (±{WEIGHT_SUM_TOLERANCE}), got {coverage_weight_sum}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub aoi_path: String,
    pub output_dir: String,
    #[serde(default = "crate::default_true")]
    pub enabled: bool,
    pub schedule: ScheduleConfig,
    pub date_range: DateRangeConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub auto_select: AutoSelectConfig,
}

impl JobConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!("invalid job name: {}", self.name)));
        }
        if !std::path::Path::new(&self.aoi_path).exists() {
            return Err(ConfigError::Invalid(format!(
                "aoi_path does not exist: {}",
                self.aoi_path
            )));
        }
        check_writable_output_dir(&self.output_dir)?;
        self.schedule.validate()?;
        self.date_range.validate()?;
        self.filters.validate()?;
        self.auto_select.validate()?;
        Ok(())
    }
}

fn check_writable_output_dir(path: &str) -> Result<()> {
    let path = std::path::Path::new(path);
    if path.exists() {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigError::Invalid(format!("cannot stat output_dir {}: {e}", path.display())))?;
        if metadata.permissions().readonly() {
            return Err(ConfigError::Invalid(format!(
                "output_dir is not writable: {}",
                path.display()
            )));
        }
    } else if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::Invalid(format!(
                "output_dir's parent does not exist: {}",
                parent.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{date_range::DateRangeType, schedule::ScheduleType};

    fn valid_auto_select() -> AutoSelectConfig {
        AutoSelectConfig {
            strategy: SelectionStrategy::BestN,
            max_products: 5,
            quality_threshold: 0.7,
            aoi_coverage_weight: 0.4,
            cloud_cover_weight: 0.4,
            recency_weight: 0.2,
            min_coverage_fraction: 0.99,
            grid_spacing_meters: None,
            solver_timeout_seconds: 300.0,
            coverage_cloud_weight: 0.5,
            coverage_quality_weight: 0.5,
        }
    }

    #[test]
    fn rejects_bad_weight_sum() {
        let mut config = valid_auto_select();
        config.aoi_coverage_weight = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_weight_sum_within_tolerance() {
        let mut config = valid_auto_select();
        config.aoi_coverage_weight = 0.405;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_max_products() {
        let mut config = valid_auto_select();
        config.max_products = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_aoi_file() {
        let job = JobConfig {
            name: "job-one".into(),
            aoi_path: "/nonexistent/path.geojson".into(),
            output_dir: "/tmp".into(),
            enabled: true,
            schedule: ScheduleConfig {
                kind: ScheduleType::Weekly,
                time: Some("00:00".into()),
                month: None,
                day: None,
                day_of_week: Some("monday".into()),
                cron: None,
            },
            date_range: DateRangeConfig {
                kind: DateRangeType::Relative,
                days: Some(30),
                start_date: None,
                end_date: None,
            },
            filters: FilterConfig::default(),
            auto_select: valid_auto_select(),
        };
        assert!(job.validate().is_err());
    }
}
