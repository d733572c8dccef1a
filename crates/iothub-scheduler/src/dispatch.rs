use async_trait::async_trait;
use iothub_core::Action;
use tracing::info;

use crate::error::Result;

/// Delivers a scheduled action to a device.
///
/// Implementations talk to whatever transport reaches the hardware. The
/// engine calls `dispatch` from a detached task under a timeout, so a slow
/// sink delays nothing but itself.
#[async_trait]
pub trait DispatchSink: Send + Sync {
    async fn dispatch(&self, device_key: &str, action: Action) -> Result<()>;
}

/// Records each dispatch through `tracing` and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

#[async_trait]
impl DispatchSink for LogDispatcher {
    async fn dispatch(&self, device_key: &str, action: Action) -> Result<()> {
        info!(device_key, %action, "dispatching action to device");
        Ok(())
    }
}
