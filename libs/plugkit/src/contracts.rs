use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::context::PluginCtx;
use crate::event_bus::Event;

/// Core plugin contract: wiring and registration.
///
/// `init()` is where a plugin publishes its services, registers generator
/// constructors into other plugins' services, binds interface slots and
/// subscribes event handlers. It must not assume any other plugin has
/// started; it may assume nothing about ordering beyond declared deps.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    async fn init(&self, ctx: &PluginCtx) -> anyhow::Result<()>;

    fn as_any(&self) -> &dyn std::any::Any;
}

/// How a plugin's `stop()` completes.
pub enum StopFlag {
    /// Shutdown finished synchronously.
    Sync,
    /// The plugin has outstanding background work; the host awaits the
    /// receiver (bounded by the shutdown deadline) before moving on.
    Deferred(oneshot::Receiver<()>),
}

impl std::fmt::Debug for StopFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopFlag::Sync => f.write_str("StopFlag::Sync"),
            StopFlag::Deferred(_) => f.write_str("StopFlag::Deferred(..)"),
        }
    }
}

/// Plugins with running state implement this in addition to [`Plugin`].
///
/// `start()` runs only after *every* discovered plugin finished (or was
/// disabled during) `init()`, so cross-plugin service lookups are safe here.
/// `stop()` runs in the exact reverse of start order.
#[async_trait]
pub trait StatefulPlugin: Send + Sync {
    async fn start(&self, ctx: &PluginCtx) -> anyhow::Result<()>;

    async fn stop(&self, ctx: &PluginCtx) -> anyhow::Result<StopFlag>;
}

/// Topic event consumer. Dispatch is synchronous on the publishing thread,
/// in subscription order.
pub trait EventHandler: Send + Sync {
    fn process(&self, event: &Event);
}
