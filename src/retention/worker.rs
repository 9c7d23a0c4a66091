use std::sync::Arc;

use crate::{
    config::RetentionConfig,
    delegation::{DelegationError, DelegationManager},
};

/// Starts the retention worker loop.
///
/// Runs a cleanup pass immediately and then every `interval_hours`, until
/// the task is cancelled. Returns at once when retention is disabled.
pub async fn start_retention_worker(manager: Arc<DelegationManager>, config: RetentionConfig) {
    if !config.enabled {
        tracing::info!("Retention worker disabled by configuration");
        return;
    }

    tracing::info!(
        interval_hours = config.interval_hours,
        "Starting delegation retention worker"
    );

    let interval = config.interval();

    loop {
        match run_retention(&manager).await {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "Retention run complete");
            }
            Ok(_) => {
                tracing::debug!("Retention run complete, no delegations to remove");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error running retention");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Run a single retention pass.
pub async fn run_retention(manager: &DelegationManager) -> Result<u64, DelegationError> {
    manager.cleanup().await
}
