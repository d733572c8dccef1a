//! `iothub-core` — configuration, error taxonomy, clock, cron grammar and shared types
//! used by every other IoT Hub crate.

pub mod clock;
pub mod config;
pub mod cron;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use cron::{CronExpr, CronField, CronParseError};
pub use error::{HubError, Result};
pub use types::{Action, Owner};
