use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use fleetdag::dag::{Dispatch, TaskId};
use fleetdag::engine::RuntimeEvent;
use fleetdag::errors::Result;
use fleetdag::exec::ExecutorBackend;
use fleetdag::types::TaskOutcome;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports TaskCompleted for each dispatched task, `Failed(1)`
///   for tasks registered with [`FakeExecutor::failing`] and `Success`
///   otherwise.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<TaskId>>>,
    failing: HashSet<TaskId>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<TaskId>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    /// Make `node/task` report a failure when it runs.
    pub fn failing(mut self, node: &str, task: &str) -> Self {
        self.failing.insert(TaskId::new(node, task));
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<Dispatch>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.task.clone());
                }

                let outcome = if failing.contains(&t.task) {
                    TaskOutcome::Failed(1)
                } else {
                    TaskOutcome::Success
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.task.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
