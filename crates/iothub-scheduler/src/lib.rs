//! `iothub-scheduler` — minute-granularity schedule matcher and dispatcher.
//!
//! # Overview
//!
//! The [`engine::ScheduleMatcher`] wakes just after each UTC minute boundary,
//! loads every active schedule from the registry and spawns one dispatch
//! task per due schedule. The pass never awaits those tasks; each runs under
//! its own timeout and logs its outcome.
//!
//! # Cron subset
//!
//! | Form                      | Example        | Meaning                          |
//! |---------------------------|----------------|----------------------------------|
//! | `minute hour`             | `30 7`         | 07:30 UTC every day              |
//! | `minute hour dom mon dow` | `0 22 * * 5`   | 22:00 UTC every Friday           |
//! | `*` in any field          | `0 *`          | top of every hour                |
//!
//! Ranges, steps and lists are rejected when the schedule is created.
//!
//! # Delivery
//!
//! Each minute is evaluated at most once. Minutes lost while the process
//! was down or stalled are not replayed.

pub mod cron;
pub mod dispatch;
pub mod engine;
pub mod error;

pub use cron::is_due;
pub use dispatch::{DispatchSink, LogDispatcher};
pub use engine::{PassReport, ScheduleMatcher};
pub use error::{Result, SchedulerError};
