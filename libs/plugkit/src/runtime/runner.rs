//! Plugkit runtime runner.
//!
//! Full cycle: discover → init → start → wait → stop → teardown.
//! Shutdown can be driven by OS signals, an external `CancellationToken`,
//! or an arbitrary future.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::context::ConfigProvider;
use crate::registry::PluginRegistry;
use crate::runtime::{shutdown, PluginHost};

/// How the runtime should decide when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, shutdown begins.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    /// Provider of per-plugin config sections (raw JSON by plugin name).
    pub plugins_cfg: Arc<dyn ConfigProvider>,
    /// Shutdown strategy.
    pub shutdown: ShutdownOptions,
    /// Deadline for plugins with deferred async stops; `None` keeps the
    /// host default.
    pub stop_deadline: Option<Duration>,
}

/// Discover plugins and drive the full lifecycle until shutdown.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(token) => token.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = shutdown::wait_for_shutdown().await {
                    tracing::warn!(error = %e, "shutdown: signal waiter failed; falling back to ctrl_c()");
                    let _ = tokio::signal::ctrl_c().await;
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let registry = PluginRegistry::discover_and_build()?;

    let mut host = PluginHost::new(registry, opts.plugins_cfg, cancel);
    if let Some(deadline) = opts.stop_deadline {
        host = host.with_stop_deadline(deadline);
    }

    host.run_full_cycle().await
}
