//! OS signal handling.

use std::sync::Arc;

use crate::lifecycle::Shutdown;

/// Trigger `shutdown` when Ctrl+C is received.
pub async fn shutdown_on_ctrl_c(shutdown: Arc<Shutdown>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Shutdown signal received");
            shutdown.trigger();
        }
        Err(e) => tracing::error!(error = %e, "Failed to install Ctrl+C handler"),
    }
}
