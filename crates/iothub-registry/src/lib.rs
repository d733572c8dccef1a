//! `iothub-registry` — per-owner devices and schedules on SQLite.
//!
//! # Quotas
//!
//! Each owner may hold `max_devices` devices and `max_schedules` schedules
//! (five of each on the free tier). The default [`QuotaMode::BestEffort`]
//! counts, compares and inserts as separate statements: writers on other
//! connections can slip in between, so a racing burst may overshoot the
//! limit. [`QuotaMode::Serialized`] runs the count and insert inside one
//! `BEGIN IMMEDIATE` transaction instead.
//!
//! # Ownership
//!
//! Devices and schedules are only reachable through their owner's email.
//! Deleting a device removes its schedules through `ON DELETE CASCADE`.
//!
//! [`QuotaMode::BestEffort`]: iothub_core::config::QuotaMode::BestEffort
//! [`QuotaMode::Serialized`]: iothub_core::config::QuotaMode::Serialized

pub mod db;
pub mod error;
pub mod registry;
pub mod types;

pub use error::{RegistryError, Result};
pub use registry::ResourceRegistry;
pub use types::{ActiveSchedule, Device, ScheduleView};
