//! Status surface
//!
//! Reduces the node's overlapping conditions to one [`Status`]. Queries never
//! fail: every dependency is tried at most once and any failure degrades to
//! `NodeDisconnected` (or an empty report). Callers poll again on their own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::error::{BridgeError, NodeError};
use crate::node::{decode, ClientFactory, NodeClient};
use crate::types::*;
use crate::worker::WorkerState;

pub struct StatusAggregator {
    factory: Arc<dyn ClientFactory>,
    state: Arc<WorkerState>,
}

impl StatusAggregator {
    pub fn new(factory: Arc<dyn ClientFactory>, state: Arc<WorkerState>) -> Self {
        Self { factory, state }
    }

    /// Current status, first match wins:
    /// pending scan, unreachable node, syncing, scanning, ready.
    pub fn get_status(&self) -> StatusReport {
        // Case 1: the worker is auditing, importing or rescanning
        if self.state.is_pending_scan() {
            return self.report(Status::PendingScan);
        }

        // Case 2: no client
        let Some(client) = self.connect() else {
            return self.report(Status::NodeDisconnected);
        };

        // Case 3: chain RPC failed or returned something unexpected
        let snapshot = match decode::chain_snapshot(client.as_ref()) {
            Ok(snapshot) => snapshot,
            Err(e) => return self.disconnected(e),
        };

        // Case 4: catching up on blocks
        if !snapshot.is_caught_up() {
            let mut report = self.report(Status::Syncing);
            report.sync_progress = Some(snapshot.sync_percent());
            return report;
        }

        // Case 5: wallet rescan in progress
        match client.wallet_scan_state() {
            Err(e) => self.disconnected(e),
            Ok(WalletScanState::Scanning { progress, .. }) => {
                let mut report = self.report(Status::Scanning);
                report.scan_progress = Some(progress * 100.0);
                report
            }
            // Case 6
            Ok(WalletScanState::NotScanning) => self.report(Status::Ready),
        }
    }

    /// Succeeds when the node answers `getblockchaininfo` with a decodable body
    pub fn get_health(&self) -> Result<(), NodeError> {
        let client = self.factory.connect()?;
        decode::chain_snapshot(client.as_ref()).map(|_| ())
    }

    /// Relay/incremental fee and node version; zeroed when the node is unavailable
    pub fn get_network(&self) -> NetworkReport {
        let Some(client) = self.connect() else {
            return NetworkReport::default();
        };

        decode::network_report(client.as_ref()).unwrap_or_else(|e| {
            log::error!("Failed to query network info: {}", e);
            NetworkReport::default()
        })
    }

    /// Fee rate in sat/kvB per confirmation target; `None` where the node
    /// cannot estimate
    pub fn get_fees(&self, targets: &[u16], mode: FeeMode) -> FeeEstimates {
        let client = self.connect();
        let mut fees = BTreeMap::new();

        for &target in targets {
            let fee = client
                .as_ref()
                .and_then(|c| estimate(c.as_ref(), target, mode));
            fees.insert(target.to_string(), fee);
        }

        FeeEstimates {
            fees,
            last_updated: Utc::now().timestamp(),
        }
    }

    fn report(&self, status: Status) -> StatusReport {
        StatusReport::new(status, self.state.profile())
    }

    fn disconnected(&self, err: NodeError) -> StatusReport {
        log::error!("Failed to query status: {}", err);
        self.report(Status::NodeDisconnected)
    }

    fn connect(&self) -> Option<Arc<dyn NodeClient>> {
        self.factory
            .connect()
            .map_err(|e| log::error!("Failed to query status: {}", e))
            .ok()
    }
}

/// Log the status every time it changes, until shutdown
pub async fn report_status(
    aggregator: Arc<StatusAggregator>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), BridgeError> {
    let mut ticker = tokio::time::interval(interval);
    let mut last: Option<Status> = None;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let aggregator = Arc::clone(&aggregator);
                let report = tokio::task::spawn_blocking(move || aggregator.get_status()).await?;

                if last != Some(report.status) {
                    match report.progress() {
                        Some(progress) => log::info!("Status: {:?} ({:.2}%)", report.status, progress),
                        None => log::info!("Status: {:?}", report.status),
                    }
                    last = Some(report.status);
                }
            }
        }
    }
    Ok(())
}

fn estimate(client: &dyn NodeClient, target: u16, mode: FeeMode) -> Option<u64> {
    match client.estimate_smart_fee(target, mode) {
        Ok(rate) => rate.map(|r| r.to_sat()),
        Err(e) => {
            log::warn!("Fee estimation for target {} failed: {}", target, e);
            None
        }
    }
}

