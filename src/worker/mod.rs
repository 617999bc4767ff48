//! Sync worker
//!
//! Runs once at startup:
//!
//! 1. Wait for the node to finish Initial Block Download
//! 2. Optionally audit the circulating supply
//! 3. Decide between importing descriptors and resuming a ranged rescan
//! 4. Run that path (blocking on the node, possibly for hours)
//! 5. Persist the tip height as the new rescan checkpoint
//!
//! A progress watchdog polls the wallet's scan state alongside. Any error
//! from either task is returned from [`SyncWorker::run`] and is meant to
//! bring the whole process down (see [`crate::supervisor`]).

mod state;
pub mod watchdog;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::checkpoint::{CheckpointStore, RescanCheckpoint};
use crate::config::{Account, DEFAULT_POLL_INTERVAL};
use crate::error::{BridgeError, NodeError};
use crate::import::ImportCoordinator;
use crate::node::{decode, DescriptorCodec, NodeClient};
use crate::supply;
use crate::types::{ChainSnapshot, NodeProfile};

pub use state::{PendingScanGuard, WorkerState};

/// Run a blocking node call off the async runtime
pub(crate) async fn blocking<T, F>(client: &Arc<dyn NodeClient>, call: F) -> Result<T, BridgeError>
where
    T: Send + 'static,
    F: FnOnce(&dyn NodeClient) -> Result<T, NodeError> + Send + 'static,
{
    let client = Arc::clone(client);
    Ok(tokio::task::spawn_blocking(move || call(client.as_ref())).await??)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportReason {
    Forced,
    NewWallet,
    NoCheckpoint,
}

/// The path chosen in the Deciding phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPath {
    Import(ImportReason),
    Resume { from: u64 },
}

/// Pick import or resume. A forced import wins over everything else.
pub fn decide(force_import: bool, new_wallet: bool, checkpoint: Option<&RescanCheckpoint>) -> SyncPath {
    if force_import {
        return SyncPath::Import(ImportReason::Forced);
    }
    if new_wallet {
        return SyncPath::Import(ImportReason::NewWallet);
    }
    match checkpoint.and_then(RescanCheckpoint::height) {
        Some(from) => SyncPath::Resume { from },
        None => SyncPath::Import(ImportReason::NoCheckpoint),
    }
}

#[derive(Clone, Debug)]
pub struct WorkerOptions {
    pub circulation_check: bool,
    pub force_import: bool,
    /// Set when the wallet was created on this start
    pub new_wallet: bool,
    pub poll_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            circulation_check: false,
            force_import: false,
            new_wallet: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a completed run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub path: SyncPath,
    pub tip_height: u64,
}

pub struct SyncWorker {
    client: Arc<dyn NodeClient>,
    /// Separate connection so progress polls never queue behind a long call
    monitor: Arc<dyn NodeClient>,
    codec: Arc<dyn DescriptorCodec>,
    checkpoints: Arc<dyn CheckpointStore>,
    state: Arc<WorkerState>,
    accounts: Vec<Account>,
    options: WorkerOptions,
}

impl SyncWorker {
    pub fn new(
        client: Arc<dyn NodeClient>,
        monitor: Arc<dyn NodeClient>,
        codec: Arc<dyn DescriptorCodec>,
        checkpoints: Arc<dyn CheckpointStore>,
        state: Arc<WorkerState>,
        accounts: Vec<Account>,
        options: WorkerOptions,
    ) -> Self {
        Self {
            client,
            monitor,
            codec,
            checkpoints,
            state,
            accounts,
            options,
        }
    }

    /// Run the orchestrator and the progress watchdog to completion.
    ///
    /// Returns the first fatal error from either of them.
    pub async fn run(self) -> Result<WorkerOutcome, BridgeError> {
        let (done_tx, done_rx) = oneshot::channel();
        let mut progress = tokio::spawn(watchdog::watch_progress(
            Arc::clone(&self.monitor),
            self.options.poll_interval,
            done_rx,
        ));

        let orchestrator = self.orchestrate();
        tokio::pin!(orchestrator);

        tokio::select! {
            outcome = &mut orchestrator => {
                let _ = done_tx.send(());
                if let Err(ref e) = outcome {
                    log::error!("Sync worker failed: {}", e);
                    progress.abort();
                    return outcome;
                }
                progress.await??;
                outcome
            }
            watched = &mut progress => {
                watched??;
                Err(BridgeError::Task("progress watchdog stopped before the worker finished".into()))
            }
        }
    }

    async fn orchestrate(&self) -> Result<WorkerOutcome, BridgeError> {
        let snapshot = self.wait_for_ibd().await?;
        self.record_profile(snapshot).await;

        if self.options.circulation_check {
            let _pending = self.state.begin_scan();
            blocking(&self.client, |c| supply::run_the_numbers(c)).await?;
        }

        let checkpoint = match self.checkpoints.load() {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                log::debug!("No usable rescan checkpoint was found: {}", e);
                None
            }
        };

        let path = decide(self.options.force_import, self.options.new_wallet, checkpoint.as_ref());
        log::info!("Wallet sync path: {:?}", path);

        match path {
            SyncPath::Import(_) => self.import().await?,
            SyncPath::Resume { from } => self.resume(from).await?,
        }

        let tip_height = self.checkpoint().await?;
        Ok(WorkerOutcome { path, tip_height })
    }

    async fn wait_for_ibd(&self) -> Result<ChainSnapshot, BridgeError> {
        loop {
            let snapshot = blocking(&self.client, |c| decode::chain_snapshot(c))
                .await
                .map_err(|e| {
                    log::error!("Failed during Initial Block Download: {}", e);
                    e
                })?;

            if snapshot.is_caught_up() {
                log::info!(
                    "Initial Block Download complete: height={} hash={}",
                    snapshot.blocks,
                    snapshot.best_block_hash
                );
                return Ok(snapshot);
            }

            log::info!(
                "Performing Initial Block Download: {}/{} ({:.2}%)",
                snapshot.blocks,
                snapshot.headers,
                snapshot.sync_percent()
            );
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Remember chain, pruning and txindex for status reports. The index
    /// lookup is informational; if it fails the index is reported as absent.
    async fn record_profile(&self, snapshot: ChainSnapshot) {
        let tx_index = match blocking(&self.client, |c| decode::tx_index(c)).await {
            Ok(enabled) => enabled,
            Err(e) => {
                log::warn!("Failed to query index info: {}", e);
                false
            }
        };

        log::info!(
            "Node profile: chain={} pruned={} txindex={}",
            snapshot.chain,
            snapshot.pruned,
            tx_index
        );
        self.state.record_profile(NodeProfile {
            chain: snapshot.chain,
            pruned: snapshot.pruned,
            tx_index,
        });
    }

    async fn scan_in_progress(&self) -> Result<bool, BridgeError> {
        let scan = blocking(&self.client, |c| c.wallet_scan_state()).await.map_err(|e| {
            log::error!("Failed to check wallet status: {}", e);
            e
        })?;
        Ok(scan.is_scanning())
    }

    async fn import(&self) -> Result<(), BridgeError> {
        // The node refuses to import while another rescan is running
        if self.scan_in_progress().await? {
            log::info!("Wallet is scanning in the background, aborting before import");
            blocking(&self.client, |c| c.abort_rescan()).await?;
        }

        let _pending = self.state.begin_scan();
        let coordinator = ImportCoordinator::new(Arc::clone(&self.client), Arc::clone(&self.codec));
        let accounts = self.accounts.clone();

        let summary = tokio::task::spawn_blocking(move || coordinator.import_accounts(&accounts))
            .await?
            .map_err(|e| {
                log::error!("Failed while importing descriptors: {}", e);
                e
            })?;

        log::info!(
            "Descriptor import finished ({} resolved, {} imported)",
            summary.resolved,
            summary.imported
        );
        Ok(())
    }

    async fn resume(&self, from: u64) -> Result<(), BridgeError> {
        if self.scan_in_progress().await? {
            log::info!("Wallet is scanning in the background, aborting before rescan");
            if let Err(e) = blocking(&self.client, |c| c.abort_rescan()).await {
                log::error!("Failed to abort rescan: {}", e);
            }
        }

        let tip = blocking(&self.client, |c| c.block_count()).await?;
        let from = from.min(tip);

        log::info!("Rescanning blocks {} to {}", from, tip);
        let _pending = self.state.begin_scan();
        blocking(&self.client, move |c| c.rescan_blockchain(from, tip))
            .await
            .map_err(|e| {
                log::error!("Failed to rescan blocks: {}", e);
                e
            })?;
        Ok(())
    }

    /// Record the tip as scanned. A failed write is logged, not retried.
    async fn checkpoint(&self) -> Result<u64, BridgeError> {
        let tip = blocking(&self.client, |c| c.block_count()).await?;
        let height = u32::try_from(tip)
            .map_err(|_| NodeError::InvalidResponse(format!("block height out of range: {}", tip)))?;
        match self.checkpoints.save(&RescanCheckpoint::new(height)) {
            Ok(()) => log::info!("Rescan checkpoint saved at height {}", tip),
            Err(e) => log::error!("Failed to dump latest block info: {}", e),
        }
        Ok(tip)
    }
}
