use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::config::MAX_CRON_FIELD_LENGTH;

/// One cron field: either `*` or a single exact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronField {
    Any,
    Exact(u32),
}

impl CronField {
    fn matches(&self, value: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::Exact(v) => *v == value,
        }
    }
}

/// A parsed minute-granularity cron expression, evaluated in UTC.
///
/// Accepts `minute hour` or the classic five fields
/// `minute hour day-of-month month day-of-week`. Each field is `*` or a
/// single integer; ranges, steps and lists are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronExpr {
    pub minute: CronField,
    pub hour: CronField,
    pub day_of_month: CronField,
    pub month: CronField,
    /// 0-6 with 0 = Sunday; 7 is normalised to 0 at parse time.
    pub day_of_week: CronField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronParseError(pub String);

impl fmt::Display for CronParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CronParseError {}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 2 && fields.len() != 5 {
            return Err(CronParseError(format!(
                "Cron expression must have 2 or 5 fields, got {}.",
                fields.len()
            )));
        }

        let minute = parse_field(fields[0], "minute", 0, 59)?;
        let hour = parse_field(fields[1], "hour", 0, 23)?;
        let (day_of_month, month, day_of_week) = if fields.len() == 5 {
            let dow = match parse_field(fields[4], "day-of-week", 0, 7)? {
                CronField::Exact(7) => CronField::Exact(0),
                other => other,
            };
            (
                parse_field(fields[2], "day-of-month", 1, 31)?,
                parse_field(fields[3], "month", 1, 12)?,
                dow,
            )
        } else {
            (CronField::Any, CronField::Any, CronField::Any)
        };

        Ok(Self {
            minute,
            hour,
            day_of_month,
            month,
            day_of_week,
        })
    }

    /// True when `now` falls inside a minute this expression selects.
    pub fn matches(&self, now: DateTime<Utc>) -> bool {
        self.minute.matches(now.minute())
            && self.hour.matches(now.hour())
            && self.day_of_month.matches(now.day())
            && self.month.matches(now.month())
            && self.day_of_week.matches(now.weekday().num_days_from_sunday())
    }
}

fn parse_field(raw: &str, name: &str, min: u32, max: u32) -> Result<CronField, CronParseError> {
    if raw.chars().count() > MAX_CRON_FIELD_LENGTH {
        return Err(CronParseError(format!(
            "Cron {name} field exceeds {MAX_CRON_FIELD_LENGTH} characters."
        )));
    }
    if raw == "*" {
        return Ok(CronField::Any);
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CronParseError(format!(
            "Unsupported cron {name} field '{raw}': only '*' or a single number is allowed."
        )));
    }
    let value: u32 = raw
        .parse()
        .map_err(|_| CronParseError(format!("Invalid cron {name} field '{raw}'.")))?;
    if value < min || value > max {
        return Err(CronParseError(format!(
            "Cron {name} field must be between {min} and {max}."
        )));
    }
    Ok(CronField::Exact(value))
}
