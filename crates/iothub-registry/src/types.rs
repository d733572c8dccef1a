use iothub_core::Action;
use serde::{Deserialize, Serialize};

/// A registered device as returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub device_key: String,
    pub created_at: String,
}

/// A schedule joined with the display name of its device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub id: i64,
    pub device_id: i64,
    pub device_name: String,
    pub cron_expression: String,
    pub action: Action,
    pub is_active: bool,
    pub created_at: String,
}

/// An enabled schedule with everything the matcher needs to dispatch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSchedule {
    pub schedule_id: i64,
    pub device_id: i64,
    pub device_key: String,
    /// Stored verbatim; the matcher parses it and skips rows that fail.
    pub cron_expression: String,
    pub action: Action,
}
