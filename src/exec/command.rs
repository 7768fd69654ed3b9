// src/exec/command.rs

//! Executor loop receiving dispatched tasks.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::Dispatch;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;

/// Spawn the background executor loop.
///
/// Every dispatched task runs in its own Tokio task. The cluster never
/// dispatches a task twice, so no bookkeeping of running processes is kept
/// here.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<Dispatch> {
    let (tx, mut rx) = mpsc::channel::<Dispatch>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        while let Some(dispatch) = rx.recv().await {
            let rt_tx = runtime_tx.clone();
            let id = dispatch.task.clone();
            tokio::spawn(async move {
                run_task(dispatch, rt_tx).await;
                debug!(task = %id, "task runner future finished");
            });
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
