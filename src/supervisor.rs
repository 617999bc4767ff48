//! Task supervisor
//!
//! Runs the service's long-lived tasks and turns any task error into a
//! process-wide shutdown: the remaining tasks are told to stop via the
//! shutdown channel, aborted, and the error is handed back to `main`.

use std::future::Future;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::error::BridgeError;

/// Exit status for a fatal task error
pub const FATAL_EXIT_CODE: i32 = 2;

pub struct Supervisor {
    tasks: JoinSet<(&'static str, Result<(), BridgeError>)>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            tasks: JoinSet::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Receiver flipped to `true` once shutdown starts
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), BridgeError>> + Send + 'static,
    {
        log::debug!("Starting task '{}'", name);
        self.tasks.spawn(async move { (name, task.await) });
    }

    /// Run until `stop` resolves (clean shutdown) or a task fails.
    ///
    /// Tasks finishing successfully are simply retired.
    pub async fn run<S>(mut self, stop: S) -> Result<(), BridgeError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(stop);

        let result = loop {
            tokio::select! {
                _ = &mut stop => {
                    log::info!("Shutdown signal received, stopping tasks...");
                    break Ok(());
                }
                Some(joined) = self.tasks.join_next() => match joined {
                    Ok((name, Ok(()))) => log::info!("Task '{}' finished", name),
                    Ok((name, Err(e))) => {
                        log::error!("Task '{}' failed: {}", name, e);
                        break Err(e);
                    }
                    Err(e) => {
                        log::error!("Task panicked or was cancelled: {}", e);
                        break Err(BridgeError::Task(e.to_string()));
                    }
                },
            }
        };

        let _ = self.shutdown_tx.send(true);
        self.tasks.shutdown().await;
        log::info!("All tasks stopped");
        result
    }
}
