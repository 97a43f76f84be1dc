//! OS-signal driven shutdown.

use anyhow::Result;
use tokio::signal;

/// Resolve when the process receives Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("Received Ctrl+C");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C");
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}
