use iothub_core::CronParseError;
use iothub_registry::RegistryError;
use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Loading active schedules from the registry failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A stored cron expression no longer parses.
    #[error("Invalid cron expression: {0}")]
    InvalidCron(#[from] CronParseError),

    /// The dispatch sink could not deliver an action.
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
