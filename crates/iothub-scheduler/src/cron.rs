use chrono::{DateTime, Utc};
use iothub_core::CronExpr;

use crate::error::Result;

/// Whether `cron` selects the UTC minute containing `now`.
///
/// Seconds are ignored, so any instant within a matching minute is due.
pub fn is_due(cron: &str, now: DateTime<Utc>) -> Result<bool> {
    Ok(CronExpr::parse(cron)?.matches(now))
}
