//! Import progress watchdog
//!
//! Polls the wallet's scan progress while the orchestrator works and logs it.
//! Makes no decisions; a failed poll is fatal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use super::blocking;
use crate::error::BridgeError;
use crate::node::NodeClient;
use crate::types::WalletScanState;

/// Poll every `interval` until `done` fires (or its sender is dropped)
pub async fn watch_progress(
    client: Arc<dyn NodeClient>,
    interval: Duration,
    mut done: oneshot::Receiver<()>,
) -> Result<(), BridgeError> {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately; the first poll is one interval in
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = &mut done => break,
            _ = ticker.tick() => {
                let polled = blocking(&client, |c| c.wallet_scan_state()).await;

                // The orchestrator may have finished while the poll was in flight;
                // its result, failed or not, describes a scan that is already over
                if !matches!(done.try_recv(), Err(TryRecvError::Empty)) {
                    break;
                }

                let state = polled.map_err(|e| {
                    log::error!("Failed to query wallet state: {}", e);
                    e
                })?;

                if let WalletScanState::Scanning { progress, duration } = state {
                    log::info!(
                        "Importing descriptors: {:.2}% ({})",
                        progress * 100.0,
                        humanize_duration(duration)
                    );
                }
            }
        }
    }

    log::info!("Shutdown worker: done");
    Ok(())
}

/// `3725s` -> `1h 2m 5s`
pub fn humanize_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    match (hours, minutes) {
        (0, 0) => format!("{}s", seconds),
        (0, _) => format!("{}m {}s", minutes, seconds),
        _ => format!("{}h {}m {}s", hours, minutes, seconds),
    }
}
