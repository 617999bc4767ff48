mod common;

use std::time::Duration;

use common::init_logging;
use corebridge::{BridgeError, Supervisor};
use tokio::sync::oneshot;

#[tokio::test]
async fn test_failing_task_shuts_everything_down() {
    init_logging();
    let mut supervisor = Supervisor::new();
    let observer = supervisor.subscribe();
    let mut shutdown = supervisor.subscribe();

    supervisor.spawn("long-runner", async move {
        let _ = shutdown.changed().await;
        Ok(())
    });
    supervisor.spawn("failing", async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Err(BridgeError::Task("node went away".into()))
    });

    let result = supervisor.run(std::future::pending::<()>()).await;

    match result {
        Err(BridgeError::Task(reason)) => assert_eq!(reason, "node went away"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(*observer.borrow());
}

async fn explode() -> Result<(), BridgeError> {
    panic!("boom")
}

#[tokio::test]
async fn test_panicking_task_is_fatal() {
    init_logging();
    let mut supervisor = Supervisor::new();
    supervisor.spawn("panicker", explode());

    let result = supervisor.run(std::future::pending::<()>()).await;
    assert!(matches!(result, Err(BridgeError::Task(_))));
}

#[tokio::test]
async fn test_stop_is_clean() {
    init_logging();
    let mut supervisor = Supervisor::new();
    let observer = supervisor.subscribe();
    supervisor.spawn("idle", std::future::pending::<Result<(), BridgeError>>());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(supervisor.run(async {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    stop_tx.send(()).unwrap();

    assert!(handle.await.unwrap().is_ok());
    assert!(*observer.borrow());
}

#[tokio::test]
async fn test_finished_task_is_retired() {
    init_logging();
    let mut supervisor = Supervisor::new();
    supervisor.spawn("one-shot", async { Ok(()) });

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(supervisor.run(async {
        let _ = stop_rx.await;
    }));

    // Still running after its only task completed
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());

    stop_tx.send(()).unwrap();
    assert!(handle.await.unwrap().is_ok());
}
