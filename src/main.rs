//! Corebridge service
//!
//! Connects to Bitcoin Core, makes sure the watch-only wallet exists, then
//! runs the sync worker and the status reporter under the supervisor.

use std::sync::Arc;

use anyhow::{Context, Result};

use corebridge::status::report_status;
use corebridge::{
    BridgeConfig, CheckpointStore, ClientFactory, FileCheckpointStore, RpcClientFactory,
    RpcNodeClient, StatusAggregator, Supervisor, SyncWorker, WalletOrigin, WorkerOptions,
    WorkerState, FATAL_EXIT_CODE,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting corebridge {}...", corebridge::VERSION);

    let config = BridgeConfig::from_env().context("Failed to load configuration")?;
    let accounts = config.accounts().context("Failed to load accounts")?;

    let client = Arc::new(RpcNodeClient::new(&config.rpc).context("Failed to create Bitcoin RPC client")?);
    let monitor = Arc::new(RpcNodeClient::new(&config.rpc).context("Failed to create Bitcoin RPC client")?);

    let wallet = config.rpc.wallet.clone();
    let bootstrap = Arc::clone(&client);
    let origin = tokio::task::spawn_blocking(move || bootstrap.load_or_create_wallet(&wallet))
        .await?
        .context("Failed to load wallet - is Bitcoin Core running?")?;

    let state = Arc::new(WorkerState::new());
    let checkpoints: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(config.checkpoint_path.clone()));
    let factory: Arc<dyn ClientFactory> = Arc::new(RpcClientFactory::new(config.rpc.clone()));

    let worker = SyncWorker::new(
        client.clone(),
        monitor,
        client,
        checkpoints,
        Arc::clone(&state),
        accounts,
        WorkerOptions {
            circulation_check: config.circulation_check,
            force_import: config.force_import,
            new_wallet: origin == WalletOrigin::Created,
            poll_interval: config.poll_interval,
        },
    );
    let aggregator = Arc::new(StatusAggregator::new(factory, state));

    let mut supervisor = Supervisor::new();
    let shutdown = supervisor.subscribe();
    supervisor.spawn("sync-worker", async move { worker.run().await.map(|_| ()) });
    supervisor.spawn("status-reporter", report_status(aggregator, config.poll_interval, shutdown));

    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if let Err(e) = supervisor.run(stop).await {
        log::error!("Fatal error, shutting down: {}", e);
        std::process::exit(FATAL_EXIT_CODE);
    }

    log::info!("Shutdown complete");
    Ok(())
}
