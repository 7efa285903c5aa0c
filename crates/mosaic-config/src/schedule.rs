//! Job trigger schedule (§6.3 `schedule:` block).

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Yearly,
    Monthly,
    Weekly,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(rename = "type")]
    pub kind: ScheduleType,
    /// `HH:MM`, 24-hour. Required unless `type = custom`.
    pub time: Option<String>,
    /// 1..12. Required when `type = yearly`.
    pub month: Option<u32>,
    /// 1..31. Required when `type = yearly | monthly`.
    pub day: Option<u32>,
    /// `monday`..`sunday` or `0..6`. Required when `type = weekly`.
    pub day_of_week: Option<String>,
    /// Five-field cron expression. Required when `type = custom`.
    pub cron: Option<String>,
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            ScheduleType::Custom => {
                let cron = self
                    .cron
                    .as_ref()
                    .ok_or_else(|| ConfigError::Invalid("cron is required when type=custom".into()))?;
                cron_parser::parse(cron, &chrono::Utc::now())
                    .map_err(|e| ConfigError::Invalid(format!("invalid cron expression: {e}")))?;
            }
            ScheduleType::Yearly => {
                self.require_time()?;
                if self.month.is_none() {
                    return Err(ConfigError::Invalid("month is required when type=yearly".into()));
                }
                self.require_day("yearly")?;
            }
            ScheduleType::Monthly => {
                self.require_time()?;
                self.require_day("monthly")?;
            }
            ScheduleType::Weekly => {
                self.require_time()?;
                if self.day_of_week.is_none() {
                    return Err(ConfigError::Invalid("day_of_week is required when type=weekly".into()));
                }
            }
        }
        Ok(())
    }

    fn require_time(&self) -> Result<()> {
        if self.time.is_none() {
            return Err(ConfigError::Invalid("time is required unless type=custom".into()));
        }
        Ok(())
    }

    fn require_day(&self, kind: &str) -> Result<()> {
        if self.day.is_none() {
            return Err(ConfigError::Invalid(format!("day is required when type={kind}")));
        }
        Ok(())
    }

    /// Normalize this schedule into a standard five-field cron expression.
    /// `custom` schedules pass their expression through unchanged.
    pub fn to_cron(&self) -> Result<String> {
        if self.kind == ScheduleType::Custom {
            return self
                .cron
                .clone()
                .ok_or_else(|| ConfigError::Invalid("cron is required when type=custom".into()));
        }

        let (hour, minute) = parse_hhmm(self.time.as_deref().unwrap_or("00:00"))?;

        Ok(match self.kind {
            ScheduleType::Yearly => {
                let month = self.month.unwrap_or(1);
                let day = self.day.unwrap_or(1);
                format!("{minute} {hour} {day} {month} *")
            }
            ScheduleType::Monthly => {
                let day = self.day.unwrap_or(1);
                format!("{minute} {hour} {day} * *")
            }
            ScheduleType::Weekly => {
                let dow = day_of_week_to_cron(self.day_of_week.as_deref().unwrap_or("monday"))?;
                format!("{minute} {hour} * * {dow}")
            }
            ScheduleType::Custom => unreachable!(),
        })
    }
}

fn parse_hhmm(time: &str) -> Result<(u32, u32)> {
    let (h, m) = time
        .split_once(':')
        .ok_or_else(|| ConfigError::Invalid(format!("invalid HH:MM time: {time}")))?;
    let hour: u32 = h
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid hour in time: {time}")))?;
    let minute: u32 = m
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid minute in time: {time}")))?;
    if hour > 23 || minute > 59 {
        return Err(ConfigError::Invalid(format!("time out of range: {time}")));
    }
    Ok((hour, minute))
}

fn day_of_week_to_cron(dow: &str) -> Result<String> {
    let normalized = dow.to_ascii_lowercase();
    let value = match normalized.as_str() {
        "sunday" | "0" => "0",
        "monday" | "1" => "1",
        "tuesday" | "2" => "2",
        "wednesday" | "3" => "3",
        "thursday" | "4" => "4",
        "friday" | "5" => "5",
        "saturday" | "6" => "6",
        other => return Err(ConfigError::Invalid(format!("invalid day_of_week: {other}"))),
    };
    Ok(value.to_string())
}

/// Minimal cron syntax check, delegated to the `cron` crate's schedule
/// parser so a malformed custom expression is caught at config-load time
/// rather than at first trigger evaluation.
mod cron_parser {
    use chrono::{DateTime, Utc};
    use std::str::FromStr;

    /// The `cron` crate expects a leading seconds field; §6.3's five-field
    /// `m h d M w` expressions are prefixed with `0` before parsing.
    pub fn parse(expr: &str, _now: &DateTime<Utc>) -> std::result::Result<cron::Schedule, String> {
        let with_seconds = format!("0 {expr}");
        cron::Schedule::from_str(&with_seconds).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yearly_to_cron() {
        let s = ScheduleConfig {
            kind: ScheduleType::Yearly,
            time: Some("03:30".into()),
            month: Some(6),
            day: Some(15),
            day_of_week: None,
            cron: None,
        };
        assert_eq!(s.to_cron().unwrap(), "30 3 15 6 *");
    }

    #[test]
    fn weekly_to_cron() {
        let s = ScheduleConfig {
            kind: ScheduleType::Weekly,
            time: Some("00:00".into()),
            month: None,
            day: None,
            day_of_week: Some("monday".into()),
            cron: None,
        };
        assert_eq!(s.to_cron().unwrap(), "0 0 * * 1");
    }

    #[test]
    fn custom_requires_cron_field() {
        let s = ScheduleConfig {
            kind: ScheduleType::Custom,
            time: None,
            month: None,
            day: None,
            day_of_week: None,
            cron: None,
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn custom_passes_through_cron_expression() {
        let s = ScheduleConfig {
            kind: ScheduleType::Custom,
            time: None,
            month: None,
            day: None,
            day_of_week: None,
            cron: Some("0 5 * * *".into()),
        };
        assert!(s.validate().is_ok());
        assert_eq!(s.to_cron().unwrap(), "0 5 * * *");
    }

    #[test]
    fn yearly_missing_month_is_rejected() {
        let s = ScheduleConfig {
            kind: ScheduleType::Yearly,
            time: Some("03:00".into()),
            month: None,
            day: Some(1),
            day_of_week: None,
            cron: None,
        };
        assert!(s.validate().is_err());
    }
}
