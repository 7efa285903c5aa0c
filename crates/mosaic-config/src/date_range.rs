//! Search date range (§6.3 `date_range:` block).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRangeType {
    Relative,
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeConfig {
    #[serde(rename = "type")]
    pub kind: DateRangeType,
    /// Positive integer. Required when `type = relative`.
    pub days: Option<u32>,
    /// `YYYY-MM-DD`. Required when `type = absolute`.
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`, must be after `start_date`. Required when `type =
    /// absolute`.
    pub end_date: Option<String>,
}

impl DateRangeConfig {
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            DateRangeType::Relative => {
                match self.days {
                    Some(d) if d > 0 => {}
                    _ => return Err(ConfigError::Invalid("days must be a positive integer when type=relative".into())),
                }
            }
            DateRangeType::Absolute => {
                let (start, end) = self.parse_absolute()?;
                if end <= start {
                    return Err(ConfigError::Invalid("end_date must be after start_date".into()));
                }
            }
        }
        Ok(())
    }

    fn parse_absolute(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start_str = self
            .start_date
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("start_date is required when type=absolute".into()))?;
        let end_str = self
            .end_date
            .as_ref()
            .ok_or_else(|| ConfigError::Invalid("end_date is required when type=absolute".into()))?;
        let start = NaiveDate::parse_from_str(start_str, "%Y-%m-%d")
            .map_err(|_| ConfigError::Invalid(format!("invalid start_date: {start_str}")))?;
        let end = NaiveDate::parse_from_str(end_str, "%Y-%m-%d")
            .map_err(|_| ConfigError::Invalid(format!("invalid end_date: {end_str}")))?;
        Ok((start, end))
    }

    /// Resolve this range to a concrete `[start, end]` window anchored on
    /// `now` for relative ranges.
    pub fn resolve_dates(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        match self.kind {
            DateRangeType::Relative => {
                let days = self
                    .days
                    .ok_or_else(|| ConfigError::Invalid("days is required when type=relative".into()))?;
                let start = now - Duration::days(days as i64);
                Ok((start, now))
            }
            DateRangeType::Absolute => {
                let (start, end) = self.parse_absolute()?;
                let start = start
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc();
                let end = end.and_hms_opt(23, 59, 59).unwrap().and_utc();
                Ok((start, end))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn relative_range_resolves_relative_to_now() {
        let config = DateRangeConfig {
            kind: DateRangeType::Relative,
            days: Some(30),
            start_date: None,
            end_date: None,
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let (start, end) = config.resolve_dates(now).unwrap();
        assert_eq!(end, now);
        assert_eq!((now - start).num_days(), 30);
    }

    #[test]
    fn absolute_range_rejects_end_before_start() {
        let config = DateRangeConfig {
            kind: DateRangeType::Absolute,
            days: None,
            start_date: Some("2024-06-01".into()),
            end_date: Some("2024-05-01".into()),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn absolute_range_resolves_to_day_bounds() {
        let config = DateRangeConfig {
            kind: DateRangeType::Absolute,
            days: None,
            start_date: Some("2024-06-01".into()),
            end_date: Some("2024-06-10".into()),
        };
        let (start, end) = config.resolve_dates(Utc::now()).unwrap();
        assert_eq!(start.format("%H:%M:%S").to_string(), "00:00:00");
        assert_eq!(end.format("%H:%M:%S").to_string(), "23:59:59");
    }

    #[test]
    fn relative_range_rejects_zero_days() {
        let config = DateRangeConfig {
            kind: DateRangeType::Relative,
            days: Some(0),
            start_date: None,
            end_date: None,
        };
        assert!(config.validate().is_err());
    }
}
