//! Background environment bootstrap
//!
//! Starting the environment that replays deferred messages is delegated to the
//! host. The relay spawns the launch as a one-shot task; the environment
//! signals completion later through `RelayCore::on_ready`.

use async_trait::async_trait;
use pushrelay_core::{CallbackHandle, RelayResult};
use tokio::task::JoinHandle;

use crate::callback::CallbackInfo;

/// What the host needs to launch the background environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    /// Dispatcher handle the entry point was resolved from
    pub dispatcher: CallbackHandle,
    /// Resolved entry point
    pub entry: CallbackInfo,
}

/// Launches the host's background execution environment
#[async_trait]
pub trait EnvironmentBootstrap: Send + Sync {
    async fn launch(&self, request: BootstrapRequest) -> anyhow::Result<()>;
}

/// Handle to a spawned bootstrap task
pub type BootstrapTask = JoinHandle<RelayResult<()>>;

/// Bootstrap for hosts that start the environment on their own
#[derive(Debug, Default, Clone, Copy)]
pub struct ExternalBootstrap;

#[async_trait]
impl EnvironmentBootstrap for ExternalBootstrap {
    async fn launch(&self, _request: BootstrapRequest) -> anyhow::Result<()> {
        Ok(())
    }
}
